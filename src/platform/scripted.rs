//! In-memory desktop implementing every platform capability.
//!
//! `ScriptedDesktop` is the handle a test (or the benchmark) keeps to open,
//! retitle and close windows, inject malformed records, and make OS calls
//! fail. The capability objects it hands out share its state, so changes
//! show up in the next enumeration exactly like on a real desktop.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::entry::ButtonEntry;
use crate::error::PlatformError;

use super::{
    Icon, PanelView, ProcessId, Row, ScreenEdge, ShellEvent, ShellEventSink, ShellIntegration,
    TextMeasure, WindowHandle, WindowManager, WindowRecord,
};

/// OS-side effects recorded by the scripted capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Icon(WindowHandle),
    Restore(WindowHandle),
    Minimize(WindowHandle),
    Foreground(WindowHandle),
    StartKey,
    Reserve(ScreenEdge, u32),
    Release,
    Subscribe,
}

#[derive(Debug, Clone)]
struct ScriptedWindow {
    handle: WindowHandle,
    title: String,
    pid: ProcessId,
    tool: bool,
    minimized: bool,
    icon: Option<Icon>,
}

#[derive(Default)]
struct DesktopState {
    windows: Vec<ScriptedWindow>,
    injected: Vec<WindowRecord>,
    pending_enumeration_failures: usize,
    reject_reservation: bool,
    reject_subscription: bool,
    reservation: Option<(ScreenEdge, u32)>,
    sink: Option<ShellEventSink>,
    foreground: Option<WindowHandle>,
    calls: Vec<Call>,
}

impl DesktopState {
    fn window(&self, handle: WindowHandle) -> Result<&ScriptedWindow, PlatformError> {
        self.windows
            .iter()
            .find(|w| w.handle == handle)
            .ok_or(PlatformError::WindowGone(handle))
    }

    fn window_mut(&mut self, handle: WindowHandle) -> Result<&mut ScriptedWindow, PlatformError> {
        self.windows
            .iter_mut()
            .find(|w| w.handle == handle)
            .ok_or(PlatformError::WindowGone(handle))
    }
}

#[derive(Clone, Default)]
pub struct ScriptedDesktop {
    state: Rc<RefCell<DesktopState>>,
}

impl ScriptedDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window_manager(&self) -> ScriptedWindowManager {
        ScriptedWindowManager {
            state: Rc::clone(&self.state),
        }
    }

    pub fn shell(&self) -> ScriptedShell {
        ScriptedShell {
            state: Rc::clone(&self.state),
        }
    }

    /// Open a normal application window with an icon.
    pub fn open(&self, raw: usize, title: &str, pid: u32) -> WindowHandle {
        self.push_window(raw, title, pid, false, Some(Icon::from_raw(raw)))
    }

    pub fn open_without_icon(&self, raw: usize, title: &str, pid: u32) -> WindowHandle {
        self.push_window(raw, title, pid, false, None)
    }

    pub fn open_tool_window(&self, raw: usize, title: &str, pid: u32) -> WindowHandle {
        self.push_window(raw, title, pid, true, None)
    }

    fn push_window(
        &self,
        raw: usize,
        title: &str,
        pid: u32,
        tool: bool,
        icon: Option<Icon>,
    ) -> WindowHandle {
        let handle = WindowHandle::new(raw);
        let mut state = self.state.borrow_mut();
        state.windows.retain(|w| w.handle != handle);
        state.windows.push(ScriptedWindow {
            handle,
            title: title.to_string(),
            pid: ProcessId(pid),
            tool,
            minimized: false,
            icon,
        });
        handle
    }

    pub fn close(&self, handle: WindowHandle) {
        let mut state = self.state.borrow_mut();
        state.windows.retain(|w| w.handle != handle);
        if state.foreground == Some(handle) {
            state.foreground = None;
        }
    }

    pub fn is_open(&self, handle: WindowHandle) -> bool {
        self.state.borrow().window(handle).is_ok()
    }

    pub fn set_title(&self, handle: WindowHandle, title: &str) {
        if let Ok(window) = self.state.borrow_mut().window_mut(handle) {
            window.title = title.to_string();
        }
    }

    pub fn set_minimized(&self, handle: WindowHandle, minimized: bool) {
        if let Ok(window) = self.state.borrow_mut().window_mut(handle) {
            window.minimized = minimized;
        }
    }

    pub fn is_minimized(&self, handle: WindowHandle) -> bool {
        self.state
            .borrow()
            .window(handle)
            .is_ok_and(|w| w.minimized)
    }

    pub fn foreground(&self) -> Option<WindowHandle> {
        self.state.borrow().foreground
    }

    /// Append a raw record to every enumeration until cleared, bypassing
    /// the window table. Used to feed malformed or duplicate records.
    pub fn inject_record(&self, record: WindowRecord) {
        self.state.borrow_mut().injected.push(record);
    }

    pub fn clear_injected(&self) {
        self.state.borrow_mut().injected.clear();
    }

    /// Make the next `count` enumerations fail.
    pub fn fail_enumerations(&self, count: usize) {
        self.state.borrow_mut().pending_enumeration_failures = count;
    }

    pub fn reject_reservation(&self) {
        self.state.borrow_mut().reject_reservation = true;
    }

    pub fn reject_subscription(&self) {
        self.state.borrow_mut().reject_subscription = true;
    }

    pub fn reservation(&self) -> Option<(ScreenEdge, u32)> {
        self.state.borrow().reservation
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().sink.is_some()
    }

    /// Deliver a shell notification to the subscriber. Returns false when
    /// nobody is subscribed.
    pub fn emit(&self, event: ShellEvent) -> bool {
        // Release the borrow while the sink runs.
        let sink = self.state.borrow_mut().sink.take();
        match sink {
            Some(mut sink) => {
                sink(event);
                let mut state = self.state.borrow_mut();
                if state.sink.is_none() {
                    state.sink = Some(sink);
                }
                true
            }
            None => false,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn icon_fetches(&self, handle: WindowHandle) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| **call == Call::Icon(handle))
            .count()
    }
}

pub struct ScriptedWindowManager {
    state: Rc<RefCell<DesktopState>>,
}

impl WindowManager for ScriptedWindowManager {
    fn enumerate_top_level_windows(&self) -> Result<Vec<WindowRecord>, PlatformError> {
        let mut state = self.state.borrow_mut();
        if state.pending_enumeration_failures > 0 {
            state.pending_enumeration_failures -= 1;
            return Err(PlatformError::call("EnumWindows", 1460));
        }
        let mut records: Vec<WindowRecord> = state
            .windows
            .iter()
            .filter(|w| !w.title.is_empty())
            .map(|w| WindowRecord::new(w.handle, w.title.clone()))
            .collect();
        records.extend(state.injected.iter().cloned());
        Ok(records)
    }

    fn is_tool_window(&self, handle: WindowHandle) -> Result<bool, PlatformError> {
        self.state.borrow().window(handle).map(|w| w.tool)
    }

    fn icon(&self, handle: WindowHandle) -> Option<Icon> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Icon(handle));
        state.window(handle).ok().and_then(|w| w.icon)
    }

    fn is_minimized(&self, handle: WindowHandle) -> Result<bool, PlatformError> {
        self.state.borrow().window(handle).map(|w| w.minimized)
    }

    fn restore(&mut self, handle: WindowHandle) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.window_mut(handle)?.minimized = false;
        state.calls.push(Call::Restore(handle));
        Ok(())
    }

    fn minimize(&mut self, handle: WindowHandle) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.window_mut(handle)?.minimized = true;
        if state.foreground == Some(handle) {
            state.foreground = None;
        }
        state.calls.push(Call::Minimize(handle));
        Ok(())
    }

    fn bring_to_foreground(&mut self, handle: WindowHandle) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.window(handle)?;
        state.foreground = Some(handle);
        state.calls.push(Call::Foreground(handle));
        Ok(())
    }

    fn owner_process_id(&self, handle: WindowHandle) -> Result<ProcessId, PlatformError> {
        self.state.borrow().window(handle).map(|w| w.pid)
    }

    fn press_start_key(&mut self) -> Result<(), PlatformError> {
        self.state.borrow_mut().calls.push(Call::StartKey);
        Ok(())
    }
}

pub struct ScriptedShell {
    state: Rc<RefCell<DesktopState>>,
}

impl ShellIntegration for ScriptedShell {
    fn reserve_edge(&mut self, edge: ScreenEdge, thickness: u32) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        if state.reject_reservation {
            return Err(PlatformError::call("SHAppBarMessage", 0));
        }
        state.reservation = Some((edge, thickness));
        state.calls.push(Call::Reserve(edge, thickness));
        Ok(())
    }

    fn release(&mut self) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        if state.reservation.take().is_some() {
            state.calls.push(Call::Release);
        }
        Ok(())
    }

    fn subscribe(&mut self, sink: ShellEventSink) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        if state.reject_subscription {
            return Err(PlatformError::call("RegisterShellHookWindow", 5));
        }
        state.sink = Some(sink);
        state.calls.push(Call::Subscribe);
        Ok(())
    }
}

/// Toolkit-side effects recorded by [`ScriptedView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOp {
    Command(Row),
    Show(WindowHandle),
    Remove(WindowHandle),
    Highlight(Row, bool),
    Redraw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    pub label: String,
    pub tooltip: String,
    pub icon: Option<Icon>,
    pub y: i32,
}

#[derive(Debug, Default)]
struct ViewState {
    rows: HashMap<Row, ViewRow>,
    highlighted: HashSet<Row>,
    ops: Vec<ViewOp>,
}

/// Headless panel that remembers what it was asked to draw. Every char is
/// `advance` pixels wide.
#[derive(Debug, Clone)]
pub struct ScriptedView {
    advance: u32,
    state: Rc<RefCell<ViewState>>,
}

impl Default for ScriptedView {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedView {
    pub fn new() -> Self {
        Self::with_advance(6)
    }

    pub fn with_advance(advance: u32) -> Self {
        Self {
            advance,
            state: Rc::default(),
        }
    }

    pub fn row(&self, row: Row) -> Option<ViewRow> {
        self.state.borrow().rows.get(&row).cloned()
    }

    /// Row drawn at vertical offset `y` for rows `row_height` pixels tall.
    pub fn row_at(&self, y: i32, row_height: i32) -> Option<Row> {
        let state = self.state.borrow();
        super::row_at(
            state.rows.iter().map(|(row, view)| (*row, view.y)),
            row_height,
            y,
        )
    }

    pub fn label(&self, handle: WindowHandle) -> Option<String> {
        self.row(Row::Window(handle)).map(|r| r.label)
    }

    pub fn tooltip(&self, handle: WindowHandle) -> Option<String> {
        self.row(Row::Window(handle)).map(|r| r.tooltip)
    }

    pub fn y(&self, handle: WindowHandle) -> Option<i32> {
        self.row(Row::Window(handle)).map(|r| r.y)
    }

    /// Window rows sorted top to bottom.
    pub fn window_rows(&self) -> Vec<WindowHandle> {
        let state = self.state.borrow();
        let mut rows: Vec<(i32, WindowHandle)> = state
            .rows
            .iter()
            .filter_map(|(row, view)| match row {
                Row::Window(handle) => Some((view.y, *handle)),
                _ => None,
            })
            .collect();
        rows.sort_unstable();
        rows.into_iter().map(|(_, handle)| handle).collect()
    }

    pub fn is_highlighted(&self, row: Row) -> bool {
        self.state.borrow().highlighted.contains(&row)
    }

    pub fn ops(&self) -> Vec<ViewOp> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }
}

impl TextMeasure for ScriptedView {
    fn text_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.advance
    }
}

impl PanelView for ScriptedView {
    fn show_command(&mut self, row: Row, label: &str, y: i32) {
        let mut state = self.state.borrow_mut();
        state.rows.insert(
            row,
            ViewRow {
                label: label.to_string(),
                tooltip: label.to_string(),
                icon: None,
                y,
            },
        );
        state.ops.push(ViewOp::Command(row));
    }

    fn show_entry(&mut self, entry: &ButtonEntry, y: i32) {
        let mut state = self.state.borrow_mut();
        state.rows.insert(
            Row::Window(entry.handle()),
            ViewRow {
                label: entry.display_text().to_string(),
                tooltip: entry.full_title().to_string(),
                icon: entry.icon(),
                y,
            },
        );
        state.ops.push(ViewOp::Show(entry.handle()));
    }

    fn remove_entry(&mut self, handle: WindowHandle) {
        let mut state = self.state.borrow_mut();
        state.rows.remove(&Row::Window(handle));
        state.highlighted.remove(&Row::Window(handle));
        state.ops.push(ViewOp::Remove(handle));
    }

    fn set_highlighted(&mut self, row: Row, highlighted: bool) {
        let mut state = self.state.borrow_mut();
        if highlighted {
            state.highlighted.insert(row);
        } else {
            state.highlighted.remove(&row);
        }
        state.ops.push(ViewOp::Highlight(row, highlighted));
    }

    fn redraw(&mut self) {
        self.state.borrow_mut().ops.push(ViewOp::Redraw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_reflects_open_and_close() {
        let desktop = ScriptedDesktop::new();
        let a = desktop.open(1, "A", 10);
        desktop.open(2, "B", 20);
        desktop.close(a);
        let records = desktop.window_manager().enumerate_top_level_windows().unwrap();
        assert_eq!(records, vec![WindowRecord::new(WindowHandle::new(2), "B")]);
    }

    #[test]
    fn closed_window_calls_fail_with_window_gone() {
        let desktop = ScriptedDesktop::new();
        let a = desktop.open(1, "A", 10);
        desktop.close(a);
        let mut wm = desktop.window_manager();
        assert_eq!(wm.restore(a), Err(PlatformError::WindowGone(a)));
        assert!(wm.owner_process_id(a).is_err());
    }

    #[test]
    fn release_is_idempotent() {
        let desktop = ScriptedDesktop::new();
        let mut shell = desktop.shell();
        shell.reserve_edge(ScreenEdge::Left, 96).unwrap();
        shell.release().unwrap();
        shell.release().unwrap();
        assert_eq!(
            desktop.calls(),
            vec![Call::Reserve(ScreenEdge::Left, 96), Call::Release]
        );
    }

    #[test]
    fn emit_reaches_subscriber() {
        let desktop = ScriptedDesktop::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink_seen = Rc::clone(&seen);
        desktop
            .shell()
            .subscribe(Box::new(move |ev| sink_seen.borrow_mut().push(ev)))
            .unwrap();
        let h = WindowHandle::new(5);
        assert!(desktop.emit(ShellEvent::WindowCreated(h)));
        assert!(desktop.emit(ShellEvent::TitleChanged(h)));
        assert_eq!(
            *seen.borrow(),
            vec![ShellEvent::WindowCreated(h), ShellEvent::TitleChanged(h)]
        );
    }
}
