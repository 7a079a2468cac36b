use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::io;
use std::mem;
use std::ptr;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{
    COLORREF, ERROR_CLASS_ALREADY_EXISTS, GetLastError, HWND, LPARAM, LRESULT, POINT, RECT, SIZE,
    WAIT_FAILED, WPARAM,
};
use windows_sys::Win32::Graphics::Gdi::{
    BeginPaint, ClientToScreen, CreateSolidBrush, DEFAULT_GUI_FONT, DT_LEFT, DT_NOPREFIX,
    DT_SINGLELINE, DT_VCENTER, DeleteObject, DrawTextW, EndPaint, FillRect, FrameRect, GetDC,
    GetStockObject, GetTextExtentPoint32W, HDC, InvalidateRect, PAINTSTRUCT, ReleaseDC,
    SelectObject, SetBkMode, SetTextColor, TRANSPARENT,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::Controls::{
    ICC_WIN95_CLASSES, INITCOMMONCONTROLSEX, InitCommonControlsEx, TOOLTIPS_CLASSW, TTF_ABSOLUTE,
    TTF_IDISHWND, TTF_TRACK, TTM_ADDTOOLW, TTM_TRACKACTIVATE, TTM_TRACKPOSITION,
    TTM_UPDATETIPTEXTW, TTS_ALWAYSTIP, TTS_NOPREFIX, TTTOOLINFOW,
};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    ReleaseCapture, SetCapture, TME_LEAVE, TRACKMOUSEEVENT, TrackMouseEvent,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CW_USEDEFAULT, CreateWindowExW, DI_NORMAL, DefWindowProcW, DestroyWindow, DispatchMessageW,
    DrawIconEx, GWLP_USERDATA, GetClientRect, GetSystemMetrics, GetWindowLongPtrW, IDC_ARROW,
    IsWindow, LoadCursorW, MSG, MsgWaitForMultipleObjects, PM_REMOVE, PeekMessageW,
    PostQuitMessage, QS_ALLINPUT, RegisterClassW, SM_CYDRAG, SW_SHOWNOACTIVATE,
    SendMessageW, SetWindowLongPtrW, ShowWindow, TranslateMessage, WM_APP, WM_CLOSE, WM_DESTROY,
    WM_ERASEBKGND, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE, WM_NCDESTROY, WM_PAINT, WM_QUIT,
    WM_SETTINGCHANGE, WNDCLASSW, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
};

use crate::config::Config;
use crate::entry::ButtonEntry;
use crate::error::PlatformError;
use crate::event_loop::{EventQueue, EventSource, PanelEvent};
use crate::platform::{
    self, Icon, PanelView, Row, ScreenEdge, ShellEventSink, TextMeasure, WindowHandle,
};

use super::shell::{position_appbar, primary_work_area, shell_event};
use super::{last_error, wide};

const CLASS_NAME: &str = "EdgebarPanel";
const WINDOW_TITLE: &str = "edgebar";

/// Notifications from the shell about other app bars.
pub(super) const APPBAR_CALLBACK: u32 = WM_APP + 1;
const ABN_POSCHANGED: usize = 1;

const WM_MOUSELEAVE: u32 = 0x02A3;
const WM_DPICHANGED: u32 = 0x02E0;

// COLORREF is 0x00BBGGRR.
const BACKGROUND: COLORREF = 0x0000_0000;
const ROW_FILL: COLORREF = 0x0080_0000;
const ROW_HIGHLIGHT: COLORREF = 0x0000_00FF;
const ROW_BORDER: COLORREF = 0x0080_8080;
const TEXT: COLORREF = 0x00FF_FFFF;
const MARGIN: i32 = 4;

struct PaintedRow {
    label: String,
    tooltip: String,
    icon: Option<Icon>,
    y: i32,
}

struct Press {
    row: Row,
    y: i32,
    dragging: bool,
}

/// State shared between the window procedure and [`Win32PanelView`].
pub(super) struct PanelState {
    events: EventQueue,
    rows: HashMap<Row, PaintedRow>,
    highlighted: HashSet<Row>,
    width: i32,
    row_height: i32,
    icon_size: i32,
    press: Option<Press>,
    hover: Option<Row>,
    leave_tracked: bool,
    tooltip: HWND,
    tooltip_row: Option<Row>,
    pub(super) shell_hook_message: u32,
    pub(super) shell_sink: Option<ShellEventSink>,
    pub(super) appbar: Option<(ScreenEdge, u32)>,
}

pub(super) type SharedState = Rc<RefCell<PanelState>>;

impl PanelState {
    fn row_at(&self, y: i32) -> Option<Row> {
        platform::row_at(
            self.rows.iter().map(|(row, painted)| (*row, painted.y)),
            self.row_height,
            y,
        )
    }
}

/// The top-most tool window that hosts all rows.
pub struct PanelWindow {
    hwnd: HWND,
    state: SharedState,
}

impl PanelWindow {
    pub fn create(config: &Config, events: EventQueue) -> Result<Self, PlatformError> {
        // SAFETY: null asks for the module of the running executable.
        let instance = unsafe { GetModuleHandleW(ptr::null()) };
        register_class(instance)?;
        init_common_controls();

        let class = wide(CLASS_NAME);
        let title = wide(WINDOW_TITLE);
        let width = config.panel.width as i32;
        let work = primary_work_area();
        // SAFETY: class and title are NUL-terminated and outlive the call.
        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_TOOLWINDOW | WS_EX_TOPMOST,
                class.as_ptr(),
                title.as_ptr(),
                WS_POPUP,
                work.left,
                work.top,
                width,
                work.bottom - work.top,
                ptr::null_mut(),
                ptr::null_mut(),
                instance,
                ptr::null(),
            )
        };
        if hwnd.is_null() {
            return Err(last_error("CreateWindowExW"));
        }

        let tooltip = create_tooltip(hwnd, instance);
        let state = Rc::new(RefCell::new(PanelState {
            events,
            rows: HashMap::new(),
            highlighted: HashSet::new(),
            width,
            row_height: config.panel.row_height as i32,
            icon_size: config.panel.icon_size as i32,
            press: None,
            hover: None,
            leave_tracked: false,
            tooltip,
            tooltip_row: None,
            shell_hook_message: 0,
            shell_sink: None,
            appbar: None,
        }));
        // Reclaimed in WM_NCDESTROY.
        let raw = Rc::into_raw(Rc::clone(&state));
        // SAFETY: `hwnd` is ours; the pointer stays valid until reclaimed.
        unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, raw as isize) };
        debug!(hwnd = ?hwnd, "panel window created");
        Ok(Self { hwnd, state })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    pub(super) fn state(&self) -> SharedState {
        Rc::clone(&self.state)
    }

    pub fn view(&self) -> Win32PanelView {
        Win32PanelView {
            hwnd: self.hwnd,
            state: self.state(),
        }
    }

    pub fn show(&self) {
        // SAFETY: `hwnd` is the live panel window.
        unsafe {
            ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
            InvalidateRect(self.hwnd, ptr::null(), 0);
        }
    }

    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for PanelWindow {
    fn drop(&mut self) {
        // SAFETY: IsWindow guards against a window the user already destroyed.
        unsafe {
            if IsWindow(self.hwnd) != 0 {
                DestroyWindow(self.hwnd);
            }
        }
    }
}

fn register_class(instance: *mut c_void) -> Result<(), PlatformError> {
    let class = wide(CLASS_NAME);
    let wc = WNDCLASSW {
        style: 0,
        lpfnWndProc: Some(panel_wndproc),
        cbClsExtra: 0,
        cbWndExtra: 0,
        hInstance: instance,
        hIcon: ptr::null_mut(),
        // SAFETY: loads a shared system cursor.
        hCursor: unsafe { LoadCursorW(ptr::null_mut(), IDC_ARROW) },
        hbrBackground: ptr::null_mut(),
        lpszMenuName: ptr::null(),
        lpszClassName: class.as_ptr(),
    };
    // SAFETY: `wc` and the class name outlive the call.
    if unsafe { RegisterClassW(&wc) } == 0 {
        // SAFETY: reads the thread's last-error value.
        let code = unsafe { GetLastError() };
        if code != ERROR_CLASS_ALREADY_EXISTS {
            return Err(PlatformError::call("RegisterClassW", code));
        }
    }
    Ok(())
}

fn init_common_controls() {
    let icc = INITCOMMONCONTROLSEX {
        dwSize: mem::size_of::<INITCOMMONCONTROLSEX>() as u32,
        dwICC: ICC_WIN95_CLASSES,
    };
    // SAFETY: `icc` is fully initialized.
    if unsafe { InitCommonControlsEx(&icc) } == 0 {
        warn!("common controls unavailable; tooltips disabled");
    }
}

fn create_tooltip(owner: HWND, instance: *mut c_void) -> HWND {
    // SAFETY: the class name is a static string from comctl32.
    let tip = unsafe {
        CreateWindowExW(
            WS_EX_TOPMOST,
            TOOLTIPS_CLASSW,
            ptr::null(),
            WS_POPUP | TTS_NOPREFIX | TTS_ALWAYSTIP,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            owner,
            ptr::null_mut(),
            instance,
            ptr::null(),
        )
    };
    if tip.is_null() {
        debug!("tooltip window unavailable");
        return tip;
    }
    let mut empty = wide("");
    let info = tool_info(owner, empty.as_mut_ptr());
    // SAFETY: `info` and its text outlive the synchronous call.
    unsafe { SendMessageW(tip, TTM_ADDTOOLW, 0, &info as *const TTTOOLINFOW as LPARAM) };
    tip
}

fn tool_info(owner: HWND, text: *mut u16) -> TTTOOLINFOW {
    // SAFETY: TTTOOLINFOW is plain data; all-zero is a valid value.
    let mut info: TTTOOLINFOW = unsafe { mem::zeroed() };
    // Size without `lpReserved` is understood by every comctl32 version.
    info.cbSize = mem::offset_of!(TTTOOLINFOW, lpReserved) as u32;
    info.uFlags = TTF_TRACK | TTF_ABSOLUTE | TTF_IDISHWND;
    info.hwnd = owner;
    info.uId = owner as usize;
    info.lpszText = text;
    info
}

fn show_tooltip(tip: HWND, owner: HWND, text: &str, x: i32, y: i32) {
    if tip.is_null() {
        return;
    }
    let mut text = wide(text);
    let info = tool_info(owner, text.as_mut_ptr());
    let mut at = POINT { x, y };
    // SAFETY: `info`, its text and `at` outlive the synchronous calls.
    unsafe {
        ClientToScreen(owner, &mut at);
        let pos = ((at.y as u32 & 0xFFFF) << 16 | (at.x as u32 & 0xFFFF)) as LPARAM;
        SendMessageW(tip, TTM_TRACKPOSITION, 0, pos);
        SendMessageW(tip, TTM_UPDATETIPTEXTW, 0, &info as *const TTTOOLINFOW as LPARAM);
        SendMessageW(tip, TTM_TRACKACTIVATE, 1, &info as *const TTTOOLINFOW as LPARAM);
    }
}

fn hide_tooltip(tip: HWND, owner: HWND) {
    if tip.is_null() {
        return;
    }
    let info = tool_info(owner, ptr::null_mut());
    // SAFETY: `info` outlives the synchronous call.
    unsafe { SendMessageW(tip, TTM_TRACKACTIVATE, 0, &info as *const TTTOOLINFOW as LPARAM) };
}

fn y_of(lparam: LPARAM) -> i32 {
    ((lparam >> 16) & 0xFFFF) as i16 as i32
}

unsafe extern "system" fn panel_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    // SAFETY: GWLP_USERDATA is either 0 or the pointer stored in `create`.
    let raw = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const RefCell<PanelState>;
    if raw.is_null() {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }
    if msg == WM_NCDESTROY {
        // SAFETY: releases the strong count taken in `create`, exactly once.
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
            drop(Rc::from_raw(raw));
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }
    }
    // SAFETY: the strong count held by the window keeps the state alive.
    let state = unsafe { &*raw };
    match handle_message(hwnd, state, msg, wparam, lparam) {
        Some(result) => result,
        None => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

/// Messages can arrive while the view holds the state (for example when a
/// tooltip call sends a notification back). Those fall through to the
/// default procedure.
fn handle_message(
    hwnd: HWND,
    state: &RefCell<PanelState>,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> Option<LRESULT> {
    match msg {
        WM_ERASEBKGND => Some(1),
        WM_PAINT => {
            let state = state.try_borrow().ok()?;
            paint(hwnd, &state);
            Some(0)
        }
        WM_LBUTTONDOWN => {
            let mut state = state.try_borrow_mut().ok()?;
            let y = y_of(lparam);
            if let Some(row) = state.row_at(y) {
                state.press = Some(Press {
                    row,
                    y,
                    dragging: false,
                });
                // SAFETY: capture keeps the release inside the panel.
                unsafe { SetCapture(hwnd) };
            }
            Some(0)
        }
        WM_MOUSEMOVE => {
            let mut state = state.try_borrow_mut().ok()?;
            on_mouse_move(hwnd, &mut state, y_of(lparam));
            Some(0)
        }
        WM_LBUTTONUP => {
            let mut state = state.try_borrow_mut().ok()?;
            // SAFETY: releasing a capture we may not hold is harmless.
            unsafe { ReleaseCapture() };
            on_release(&mut state, y_of(lparam));
            Some(0)
        }
        WM_MOUSELEAVE => {
            let mut state = state.try_borrow_mut().ok()?;
            state.leave_tracked = false;
            if state.hover.take().is_some() {
                state.events.push(PanelEvent::Hover(None));
            }
            Some(0)
        }
        WM_CLOSE => {
            state.try_borrow().ok()?.events.push(PanelEvent::Quit);
            Some(0)
        }
        WM_DESTROY => {
            // SAFETY: posts WM_QUIT to this thread's queue.
            unsafe { PostQuitMessage(0) };
            Some(0)
        }
        WM_SETTINGCHANGE | WM_DPICHANGED => {
            if let Ok(state) = state.try_borrow() {
                state.events.push(PanelEvent::MetricsChanged);
            }
            None
        }
        APPBAR_CALLBACK => {
            if wparam == ABN_POSCHANGED {
                let appbar = state.try_borrow().ok()?.appbar;
                if let Some((edge, thickness)) = appbar {
                    position_appbar(hwnd, edge, thickness);
                }
            }
            Some(0)
        }
        _ => on_shell_hook(state, msg, wparam, lparam),
    }
}

fn on_mouse_move(hwnd: HWND, state: &mut PanelState, y: i32) {
    if !state.leave_tracked {
        let mut track = TRACKMOUSEEVENT {
            cbSize: mem::size_of::<TRACKMOUSEEVENT>() as u32,
            dwFlags: TME_LEAVE,
            hwndTrack: hwnd,
            dwHoverTime: 0,
        };
        // SAFETY: `track` is fully initialized.
        state.leave_tracked = unsafe { TrackMouseEvent(&mut track) } != 0;
    }

    if let Some(press) = state.press.as_mut()
        && !press.dragging
        && matches!(press.row, Row::Window(_))
    {
        // SAFETY: metric query without side effects.
        let threshold = unsafe { GetSystemMetrics(SM_CYDRAG) };
        press.dragging = (y - press.y).abs() > threshold;
    }

    let row = state.row_at(y);
    if row != state.hover {
        state.hover = row;
        state.events.push(PanelEvent::Hover(row));
    }
}

fn on_release(state: &mut PanelState, y: i32) {
    let Some(press) = state.press.take() else {
        return;
    };
    let released = state.row_at(y);
    if press.dragging {
        if let (Row::Window(source), Some(Row::Window(target))) = (press.row, released)
            && source != target
        {
            state.events.push(PanelEvent::Drop { source, target });
        }
    } else if released == Some(press.row) {
        state.events.push(PanelEvent::Click(press.row));
    }
}

fn on_shell_hook(
    state: &RefCell<PanelState>,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> Option<LRESULT> {
    let mut guard = state.try_borrow_mut().ok()?;
    if guard.shell_hook_message == 0 || msg != guard.shell_hook_message {
        return None;
    }
    let event = shell_event(wparam, lparam)?;
    // The sink runs without the state borrowed.
    let mut sink = guard.shell_sink.take()?;
    drop(guard);
    sink(event);
    if let Ok(mut guard) = state.try_borrow_mut()
        && guard.shell_sink.is_none()
    {
        guard.shell_sink = Some(sink);
    }
    Some(0)
}

fn fill(hdc: HDC, rect: &RECT, color: COLORREF) {
    // SAFETY: the brush is created, used and deleted within this call.
    unsafe {
        let brush = CreateSolidBrush(color);
        FillRect(hdc, rect, brush);
        DeleteObject(brush);
    }
}

fn frame(hdc: HDC, rect: &RECT, color: COLORREF) {
    // SAFETY: the brush is created, used and deleted within this call.
    unsafe {
        let brush = CreateSolidBrush(color);
        FrameRect(hdc, rect, brush);
        DeleteObject(brush);
    }
}

fn paint(hwnd: HWND, state: &PanelState) {
    // SAFETY: PAINTSTRUCT is plain data filled in by BeginPaint.
    let mut ps: PAINTSTRUCT = unsafe { mem::zeroed() };
    // SAFETY: BeginPaint/EndPaint bracket all drawing on the returned DC.
    unsafe {
        let hdc = BeginPaint(hwnd, &mut ps);
        if !hdc.is_null() {
            let mut client: RECT = mem::zeroed();
            GetClientRect(hwnd, &mut client);
            fill(hdc, &client, BACKGROUND);
            let previous = SelectObject(hdc, GetStockObject(DEFAULT_GUI_FONT));
            SetBkMode(hdc, TRANSPARENT);
            SetTextColor(hdc, TEXT);
            for (row, painted) in &state.rows {
                paint_row(hdc, state, *row, painted);
            }
            SelectObject(hdc, previous);
        }
        EndPaint(hwnd, &ps);
    }
}

fn paint_row(hdc: HDC, state: &PanelState, row: Row, painted: &PaintedRow) {
    let rect = RECT {
        left: 0,
        top: painted.y,
        right: state.width,
        bottom: painted.y + state.row_height,
    };
    let color = if state.highlighted.contains(&row) {
        ROW_HIGHLIGHT
    } else {
        ROW_FILL
    };
    fill(hdc, &rect, color);
    frame(hdc, &rect, ROW_BORDER);

    let mut text_left = MARGIN;
    if let Some(icon) = painted.icon {
        let top = painted.y + (state.row_height - state.icon_size) / 2;
        // SAFETY: the icon is borrowed from its window; a stale one fails to draw.
        unsafe {
            DrawIconEx(
                hdc,
                MARGIN,
                top,
                icon.raw() as *mut c_void,
                state.icon_size,
                state.icon_size,
                0,
                ptr::null_mut(),
                DI_NORMAL,
            )
        };
        text_left += state.icon_size + MARGIN;
    }

    let text: Vec<u16> = painted.label.encode_utf16().collect();
    let mut text_rect = RECT {
        left: text_left,
        top: painted.y,
        right: state.width - MARGIN,
        bottom: painted.y + state.row_height,
    };
    // SAFETY: `text` and `text_rect` outlive the call.
    unsafe {
        DrawTextW(
            hdc,
            text.as_ptr(),
            text.len() as i32,
            &mut text_rect,
            DT_LEFT | DT_VCENTER | DT_SINGLELINE | DT_NOPREFIX,
        )
    };
}

/// [`PanelView`] over the native panel window.
pub struct Win32PanelView {
    hwnd: HWND,
    state: SharedState,
}

impl Win32PanelView {
    fn sync_tooltip(&self, row: Row) {
        let (tip, text, y, width) = {
            let state = self.state.borrow();
            let Some(painted) = state.rows.get(&row) else {
                return;
            };
            (state.tooltip, painted.tooltip.clone(), painted.y, state.width)
        };
        show_tooltip(tip, self.hwnd, &text, width, y);
    }

    fn hide_tooltip_for(&self, row: Row) {
        let tip = {
            let mut state = self.state.borrow_mut();
            if state.tooltip_row != Some(row) {
                return;
            }
            state.tooltip_row = None;
            state.tooltip
        };
        hide_tooltip(tip, self.hwnd);
    }
}

impl TextMeasure for Win32PanelView {
    fn text_width(&self, text: &str) -> u32 {
        let units: Vec<u16> = text.encode_utf16().collect();
        let mut size = SIZE { cx: 0, cy: 0 };
        // SAFETY: the DC is released before returning; `units` and `size`
        // outlive the calls.
        unsafe {
            let hdc = GetDC(self.hwnd);
            if hdc.is_null() {
                return 0;
            }
            let previous = SelectObject(hdc, GetStockObject(DEFAULT_GUI_FONT));
            GetTextExtentPoint32W(hdc, units.as_ptr(), units.len() as i32, &mut size);
            SelectObject(hdc, previous);
            ReleaseDC(self.hwnd, hdc);
        }
        size.cx.max(0) as u32
    }
}

impl PanelView for Win32PanelView {
    fn show_command(&mut self, row: Row, label: &str, y: i32) {
        self.state.borrow_mut().rows.insert(
            row,
            PaintedRow {
                label: label.to_string(),
                tooltip: label.to_string(),
                icon: None,
                y,
            },
        );
    }

    fn show_entry(&mut self, entry: &ButtonEntry, y: i32) {
        let row = Row::Window(entry.handle());
        let tooltip_here = {
            let mut state = self.state.borrow_mut();
            state.rows.insert(
                row,
                PaintedRow {
                    label: entry.display_text().to_string(),
                    tooltip: entry.full_title().to_string(),
                    icon: entry.icon(),
                    y,
                },
            );
            state.tooltip_row == Some(row)
        };
        if tooltip_here {
            self.sync_tooltip(row);
        }
    }

    fn remove_entry(&mut self, handle: WindowHandle) {
        let row = Row::Window(handle);
        {
            let mut state = self.state.borrow_mut();
            state.rows.remove(&row);
            state.highlighted.remove(&row);
            if state.press.as_ref().is_some_and(|p| p.row == row) {
                state.press = None;
            }
        }
        self.hide_tooltip_for(row);
    }

    fn set_highlighted(&mut self, row: Row, highlighted: bool) {
        {
            let mut state = self.state.borrow_mut();
            if highlighted {
                state.highlighted.insert(row);
            } else {
                state.highlighted.remove(&row);
            }
        }
        match (row, highlighted) {
            (Row::Window(_), true) => {
                self.state.borrow_mut().tooltip_row = Some(row);
                self.sync_tooltip(row);
            }
            (_, false) => self.hide_tooltip_for(row),
            _ => {}
        }
    }

    fn redraw(&mut self) {
        // SAFETY: queues a repaint; no message is sent synchronously.
        unsafe { InvalidateRect(self.hwnd, ptr::null(), 0) };
    }
}

/// [`EventSource`] over the thread's message queue.
///
/// Dispatching messages runs the window procedure, which only pushes onto
/// the shared [`EventQueue`]. The pump reports readiness from that queue.
pub struct MessagePump {
    events: EventQueue,
}

impl MessagePump {
    pub fn new(events: EventQueue) -> Self {
        Self { events }
    }

    fn dispatch_pending(&mut self) {
        // SAFETY: MSG is plain data filled in by PeekMessageW.
        let mut msg: MSG = unsafe { mem::zeroed() };
        // SAFETY: `msg` outlives every call in the loop.
        unsafe {
            while PeekMessageW(&mut msg, ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
                if msg.message == WM_QUIT {
                    self.events.push(PanelEvent::Quit);
                    break;
                }
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

impl EventSource for MessagePump {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
        self.dispatch_pending();
        if !self.events.is_empty() {
            return Ok(true);
        }
        let millis = timeout.as_millis().min(u128::from(u32::MAX - 1)) as u32;
        // SAFETY: no handles; waits for input on this thread's queue only.
        let woke =
            unsafe { MsgWaitForMultipleObjects(0, ptr::null(), 0, millis, QS_ALLINPUT) };
        if woke == WAIT_FAILED {
            return Err(io::Error::last_os_error());
        }
        self.dispatch_pending();
        Ok(!self.events.is_empty())
    }

    fn read(&mut self) -> io::Result<PanelEvent> {
        self.events
            .pop()
            .ok_or_else(|| io::Error::other("no panel event pending"))
    }
}
