//! Ties the window list to the OS and the toolkit.
//!
//! The controller owns the two static commands, the refresh cadence, the
//! screen-edge reservation and the click-to-toggle activation state. It is
//! only ever driven from the event thread through [`PanelController::handle`]
//! and [`PanelController::on_idle`].

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ActivationError, EnumerationError, PanelError, SetupError};
use crate::event_loop::{ControlFlow, EventQueue, PanelEvent};
use crate::platform::{
    PanelView, ProcessId, Row, ScreenEdge, ShellIntegration, WindowHandle, WindowManager,
};
use crate::window_list::{RefreshReport, WindowListSynchronizer};

/// Result of a click on a window row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The window was restored if needed and brought to the front.
    Foregrounded,
    /// The window belonged to the most recently activated process and was
    /// minimized instead.
    Minimized,
}

/// Vertical placement of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowGeometry {
    pub row_height: u32,
    /// Offset of window slot 0.
    pub list_offset: u32,
}

impl RowGeometry {
    pub fn command_offset(&self, row: Row) -> Option<i32> {
        match row {
            Row::StartKey => Some(0),
            Row::Close => Some(self.row_height as i32),
            Row::Window(_) => None,
        }
    }

    pub fn slot_offset(&self, slot: usize) -> i32 {
        self.list_offset as i32 + slot as i32 * self.row_height as i32
    }
}

pub struct PanelController<W: WindowManager, S: ShellIntegration, V: PanelView> {
    wm: W,
    shell: S,
    view: V,
    windows: WindowListSynchronizer,
    geometry: RowGeometry,
    panel_width: u32,
    poll_interval: Duration,
    last_refresh: Option<Instant>,
    /// Process most recently brought to the front from the panel.
    tracked_process: Option<ProcessId>,
    hovered: Option<Row>,
    reserved: bool,
    subscribed: bool,
    shut_down: bool,
}

impl<W: WindowManager, S: ShellIntegration, V: PanelView> PanelController<W, S, V> {
    /// Reserve the screen edge, subscribe to shell notifications, draw the
    /// static commands and populate the list.
    ///
    /// Setup failures are logged and leave the panel in degraded mode: it
    /// keeps working off the periodic poll alone.
    pub fn start(wm: W, shell: S, view: V, config: &Config, events: &EventQueue) -> Self {
        let mut controller = Self {
            wm,
            shell,
            view,
            windows: WindowListSynchronizer::new(config.text_layout(), config.refresh.reorder),
            geometry: RowGeometry {
                row_height: config.panel.row_height,
                list_offset: config.list_offset(),
            },
            panel_width: config.panel.width,
            poll_interval: config.poll_interval(),
            last_refresh: None,
            tracked_process: None,
            hovered: None,
            reserved: false,
            subscribed: false,
            shut_down: false,
        };

        match controller
            .shell
            .reserve_edge(ScreenEdge::Left, controller.panel_width)
        {
            Ok(()) => controller.reserved = true,
            Err(err) => warn!(error = %SetupError::Reservation(err), "running without an app-bar reservation"),
        }

        let sink = events.clone();
        match controller
            .shell
            .subscribe(Box::new(move |event| sink.push(PanelEvent::Shell(event))))
        {
            Ok(()) => controller.subscribed = true,
            Err(err) => warn!(error = %SetupError::Subscription(err), "falling back to polling only"),
        }

        controller.show_commands(config);
        controller.refresh_logged();
        info!(
            windows = controller.windows.len(),
            degraded = controller.is_degraded(),
            "panel started"
        );
        controller
    }

    fn show_commands(&mut self, config: &Config) {
        for (row, label) in [
            (Row::StartKey, config.panel.start_label.as_str()),
            (Row::Close, config.panel.close_label.as_str()),
        ] {
            if let Some(y) = self.geometry.command_offset(row) {
                self.view.show_command(row, label, y);
            }
        }
        self.view.redraw();
    }

    pub fn windows(&self) -> &WindowListSynchronizer {
        &self.windows
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn window_manager(&self) -> &W {
        &self.wm
    }

    pub fn geometry(&self) -> RowGeometry {
        self.geometry
    }

    pub fn tracked_process(&self) -> Option<ProcessId> {
        self.tracked_process
    }

    pub fn hovered(&self) -> Option<Row> {
        self.hovered
    }

    /// True when shell notifications are unavailable and only the poll keeps
    /// the list current.
    pub fn is_degraded(&self) -> bool {
        !self.subscribed
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    /// Synchronize with the OS and push the differences to the view.
    pub fn refresh(&mut self) -> Result<RefreshReport, EnumerationError> {
        self.last_refresh = Some(Instant::now());
        let report = self.windows.refresh(&self.wm, &self.view)?;
        self.apply(&report);
        Ok(report)
    }

    fn refresh_logged(&mut self) {
        if let Err(err) = self.refresh() {
            warn!(error = %err, "keeping previous window list");
        }
    }

    fn apply(&mut self, report: &RefreshReport) {
        if report.is_empty() {
            return;
        }
        for handle in &report.removed {
            self.view.remove_entry(*handle);
            if self.hovered == Some(Row::Window(*handle)) {
                self.hovered = None;
            }
        }
        for handle in report.dirty() {
            self.show(handle);
        }
        self.view.redraw();
    }

    fn show(&mut self, handle: WindowHandle) {
        if let Some(entry) = self.windows.get(handle) {
            let y = self.geometry.slot_offset(entry.slot_index());
            self.view.show_entry(entry, y);
        }
    }

    /// Periodic fallback refresh. Returns true when a refresh ran.
    pub fn on_idle(&mut self, now: Instant) -> bool {
        let due = self
            .last_refresh
            .is_none_or(|last| now.saturating_duration_since(last) >= self.poll_interval);
        if due {
            self.refresh_logged();
        }
        due
    }

    pub fn handle(&mut self, event: PanelEvent) -> ControlFlow {
        match event {
            PanelEvent::Shell(shell_event) => {
                debug!(?shell_event, "shell notification");
                self.refresh_logged();
            }
            PanelEvent::Click(Row::StartKey) => self.press_start_key(),
            PanelEvent::Click(Row::Close) | PanelEvent::Quit => {
                self.shutdown();
                return ControlFlow::Quit;
            }
            PanelEvent::Click(Row::Window(handle)) => {
                // Failures are logged and reset inside `activate`.
                let _ = self.activate(handle);
            }
            PanelEvent::Drop { source, target } => {
                if let Err(err) = self.swap(source, target) {
                    debug!(error = %err, "ignoring drop");
                }
            }
            PanelEvent::Hover(row) => self.set_hovered(row),
            PanelEvent::MetricsChanged => self.relabel(),
        }
        ControlFlow::Continue
    }

    /// Click-to-toggle at process granularity.
    ///
    /// If the window's process is the one this panel last brought to the
    /// front, the window is minimized and tracking is cleared. Otherwise it
    /// is restored, raised and its process becomes the tracked one. On any
    /// failure tracking is cleared so the next click starts fresh.
    pub fn activate(&mut self, handle: WindowHandle) -> Result<Activation, ActivationError> {
        let result = self.try_activate(handle);
        match &result {
            Ok(activation) => debug!(%handle, ?activation, "window activated"),
            Err(err) => {
                warn!(error = %err, "activation failed");
                self.tracked_process = None;
            }
        }
        result
    }

    fn try_activate(&mut self, handle: WindowHandle) -> Result<Activation, ActivationError> {
        let failed = |source| ActivationError { handle, source };
        let pid = self.wm.owner_process_id(handle).map_err(failed)?;

        if self.tracked_process == Some(pid) {
            self.wm.minimize(handle).map_err(failed)?;
            self.tracked_process = None;
            return Ok(Activation::Minimized);
        }

        if self.wm.is_minimized(handle).map_err(failed)? {
            self.wm.restore(handle).map_err(failed)?;
        }
        self.wm.bring_to_foreground(handle).map_err(failed)?;
        self.tracked_process = Some(pid);
        Ok(Activation::Foregrounded)
    }

    pub fn press_start_key(&mut self) {
        if let Err(err) = self.wm.press_start_key() {
            warn!(error = %err, "could not send start key");
        }
    }

    /// Swap two window rows and redraw both.
    pub fn swap(&mut self, a: WindowHandle, b: WindowHandle) -> Result<bool, PanelError> {
        let swapped = self.windows.swap(a, b)?;
        if swapped {
            self.show(a);
            self.show(b);
            self.view.redraw();
        }
        Ok(swapped)
    }

    fn set_hovered(&mut self, row: Option<Row>) {
        if self.hovered == row {
            return;
        }
        if let Some(old) = self.hovered.take() {
            self.view.set_highlighted(old, false);
        }
        if let Some(new) = row {
            self.view.set_highlighted(new, true);
        }
        self.hovered = row;
        self.view.redraw();
    }

    fn relabel(&mut self) {
        let changed = self.windows.relabel_all(&self.view);
        if changed.is_empty() {
            return;
        }
        for handle in changed {
            self.show(handle);
        }
        self.view.redraw();
    }

    /// Release the screen-edge reservation. Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if self.reserved {
            match self.shell.release() {
                Ok(()) => info!("released screen edge"),
                Err(err) => warn!(error = %err, "failed to release screen edge"),
            }
            self.reserved = false;
        }
    }
}

impl<W: WindowManager, S: ShellIntegration, V: PanelView> Drop for PanelController<W, S, V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ShellEvent;
    use crate::platform::scripted::{
        Call, ScriptedDesktop, ScriptedShell, ScriptedView, ScriptedWindowManager, ViewOp,
    };
    use pretty_assertions::assert_eq;

    type Controller = PanelController<ScriptedWindowManager, ScriptedShell, ScriptedView>;

    fn h(raw: usize) -> WindowHandle {
        WindowHandle::new(raw)
    }

    fn start(desktop: &ScriptedDesktop) -> (Controller, ScriptedView, EventQueue) {
        let view = ScriptedView::new();
        let events = EventQueue::new();
        let controller = PanelController::start(
            desktop.window_manager(),
            desktop.shell(),
            view.clone(),
            &Config::default(),
            &events,
        );
        (controller, view, events)
    }

    #[test]
    fn start_reserves_subscribes_and_populates() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Notepad", 100);
        desktop.open(2, "Mail - Inbox", 200);
        let (controller, view, _events) = start(&desktop);

        assert_eq!(desktop.reservation(), Some((ScreenEdge::Left, 96)));
        assert!(desktop.is_subscribed());
        assert!(!controller.is_degraded());
        assert_eq!(view.row(Row::StartKey).unwrap().y, 0);
        assert_eq!(view.row(Row::Close).unwrap().y, 32);
        assert_eq!(view.window_rows(), vec![h(1), h(2)]);
        assert_eq!(view.y(h(1)), Some(96));
        assert_eq!(view.y(h(2)), Some(128));
        assert_eq!(view.tooltip(h(2)).as_deref(), Some("Mail - Inbox"));
    }

    #[test]
    fn activate_toggles_per_process() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Notepad", 100);
        desktop.set_minimized(h(1), true);
        let (mut controller, _view, _events) = start(&desktop);
        desktop.clear_calls();

        assert_eq!(controller.activate(h(1)).unwrap(), Activation::Foregrounded);
        assert_eq!(controller.tracked_process(), Some(ProcessId(100)));
        assert_eq!(desktop.calls(), vec![Call::Restore(h(1)), Call::Foreground(h(1))]);
        assert_eq!(desktop.foreground(), Some(h(1)));

        assert_eq!(controller.activate(h(1)).unwrap(), Activation::Minimized);
        assert_eq!(controller.tracked_process(), None);
        assert!(desktop.is_minimized(h(1)));
    }

    #[test]
    fn second_window_of_tracked_process_is_minimized() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Document 1 - Word", 100);
        desktop.open(2, "Document 2 - Word", 100);
        desktop.open(3, "Terminal", 300);
        let (mut controller, _view, _events) = start(&desktop);

        controller.activate(h(1)).unwrap();
        assert_eq!(controller.activate(h(2)).unwrap(), Activation::Minimized);

        controller.activate(h(3)).unwrap();
        assert_eq!(controller.activate(h(1)).unwrap(), Activation::Foregrounded);
        assert_eq!(controller.tracked_process(), Some(ProcessId(100)));
    }

    #[test]
    fn failed_activation_clears_tracking() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Notepad", 100);
        desktop.open(2, "Paint", 200);
        let (mut controller, _view, _events) = start(&desktop);
        controller.activate(h(1)).unwrap();

        desktop.close(h(2));
        let err = controller.activate(h(2)).unwrap_err();
        assert_eq!(err.handle, h(2));
        assert_eq!(controller.tracked_process(), None);

        // The next click on the surviving window raises it again.
        assert_eq!(controller.activate(h(1)).unwrap(), Activation::Foregrounded);
    }

    #[test]
    fn shell_notification_is_queued_then_refreshes() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Notepad", 100);
        let (mut controller, view, events) = start(&desktop);

        desktop.open(2, "Calculator", 200);
        assert!(desktop.emit(ShellEvent::WindowCreated(h(2))));
        // Nothing changes until the loop dispatches the queued event.
        assert_eq!(controller.windows().len(), 1);

        let event = events.pop().unwrap();
        assert_eq!(event, PanelEvent::Shell(ShellEvent::WindowCreated(h(2))));
        controller.handle(event);
        assert_eq!(view.window_rows(), vec![h(1), h(2)]);
    }

    #[test]
    fn idle_refresh_follows_poll_interval() {
        let desktop = ScriptedDesktop::new();
        let (mut controller, view, _events) = start(&desktop);
        let started = Instant::now();

        desktop.open(1, "Notepad", 100);
        assert!(!controller.on_idle(started));
        assert!(view.window_rows().is_empty());

        assert!(controller.on_idle(started + Duration::from_secs(2)));
        assert_eq!(view.window_rows(), vec![h(1)]);
    }

    #[test]
    fn refresh_without_changes_touches_nothing() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Notepad", 100);
        desktop.open(2, "Mail - Inbox", 200);
        let (mut controller, view, _events) = start(&desktop);
        view.clear_ops();

        let report = controller.refresh().unwrap();

        assert!(report.is_empty());
        assert!(view.ops().is_empty());
    }

    #[test]
    fn close_releases_reservation_once() {
        let desktop = ScriptedDesktop::new();
        let (mut controller, _view, _events) = start(&desktop);

        assert!(matches!(
            controller.handle(PanelEvent::Click(Row::Close)),
            ControlFlow::Quit
        ));
        assert_eq!(desktop.reservation(), None);
        drop(controller);

        let releases = desktop
            .calls()
            .into_iter()
            .filter(|c| *c == Call::Release)
            .count();
        assert_eq!(releases, 1);
    }

    #[test]
    fn drop_releases_reservation() {
        let desktop = ScriptedDesktop::new();
        let (controller, _view, _events) = start(&desktop);
        assert!(desktop.reservation().is_some());
        drop(controller);
        assert_eq!(desktop.reservation(), None);
    }

    #[test]
    fn setup_rejections_degrade_to_polling() {
        let desktop = ScriptedDesktop::new();
        desktop.reject_reservation();
        desktop.reject_subscription();
        desktop.open(1, "Notepad", 100);
        let (mut controller, view, _events) = start(&desktop);

        assert!(controller.is_degraded());
        assert!(!controller.is_reserved());
        assert_eq!(view.window_rows(), vec![h(1)]);

        desktop.open(2, "Calculator", 200);
        assert!(controller.on_idle(Instant::now() + Duration::from_secs(5)));
        assert_eq!(view.window_rows(), vec![h(1), h(2)]);
    }

    #[test]
    fn start_key_click_sends_key() {
        let desktop = ScriptedDesktop::new();
        let (mut controller, _view, _events) = start(&desktop);
        desktop.clear_calls();
        controller.handle(PanelEvent::Click(Row::StartKey));
        assert_eq!(desktop.calls(), vec![Call::StartKey]);
    }

    #[test]
    fn drop_event_swaps_rows() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Notepad", 100);
        desktop.open(2, "Mail - Inbox", 200);
        desktop.open(3, "Terminal", 300);
        let (mut controller, view, _events) = start(&desktop);

        controller.handle(PanelEvent::Drop {
            source: h(3),
            target: h(1),
        });

        assert_eq!(view.window_rows(), vec![h(3), h(2), h(1)]);
        assert_eq!(controller.windows().get(h(3)).unwrap().slot_index(), 0);
    }

    #[test]
    fn hover_moves_highlight() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Notepad", 100);
        let (mut controller, view, _events) = start(&desktop);
        view.clear_ops();

        controller.handle(PanelEvent::Hover(Some(Row::Window(h(1)))));
        controller.handle(PanelEvent::Hover(Some(Row::Window(h(1)))));
        controller.handle(PanelEvent::Hover(Some(Row::Close)));
        controller.handle(PanelEvent::Hover(None));

        assert!(!view.is_highlighted(Row::Window(h(1))));
        assert!(!view.is_highlighted(Row::Close));
        assert_eq!(
            view.ops()
                .into_iter()
                .filter(|op| matches!(op, ViewOp::Highlight(..)))
                .collect::<Vec<_>>(),
            vec![
                ViewOp::Highlight(Row::Window(h(1)), true),
                ViewOp::Highlight(Row::Window(h(1)), false),
                ViewOp::Highlight(Row::Close, true),
                ViewOp::Highlight(Row::Close, false),
            ]
        );
    }

    #[test]
    fn laid_out_rows_hit_test_by_offset() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Notepad", 100);
        desktop.open(2, "Mail - Inbox", 200);
        let (_controller, view, _events) = start(&desktop);

        assert_eq!(view.row_at(0, 32), Some(Row::StartKey));
        assert_eq!(view.row_at(31, 32), Some(Row::StartKey));
        assert_eq!(view.row_at(32, 32), Some(Row::Close));
        assert_eq!(view.row_at(70, 32), None);
        assert_eq!(view.row_at(96, 32), Some(Row::Window(h(1))));
        assert_eq!(view.row_at(130, 32), Some(Row::Window(h(2))));
        assert_eq!(view.row_at(160, 32), None);
        assert_eq!(view.row_at(-1, 32), None);
    }

    #[test]
    fn removing_hovered_window_clears_hover() {
        let desktop = ScriptedDesktop::new();
        desktop.open(1, "Notepad", 100);
        let (mut controller, _view, _events) = start(&desktop);
        controller.handle(PanelEvent::Hover(Some(Row::Window(h(1)))));

        desktop.close(h(1));
        controller.refresh().unwrap();

        assert_eq!(controller.hovered(), None);
    }
}
