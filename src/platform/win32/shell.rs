use std::ffi::c_void;
use std::mem;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{HWND, RECT};
use windows_sys::Win32::UI::Shell::{
    ABE_BOTTOM, ABE_LEFT, ABE_RIGHT, ABE_TOP, ABM_NEW, ABM_QUERYPOS, ABM_REMOVE, ABM_SETPOS,
    APPBARDATA, SHAppBarMessage,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    DeregisterShellHookWindow, GetSystemMetrics, MoveWindow, RegisterShellHookWindow,
    RegisterWindowMessageW, SM_CXSCREEN, SM_CYSCREEN, SPI_GETWORKAREA, SystemParametersInfoW,
};

use crate::error::PlatformError;
use crate::platform::{ScreenEdge, ShellEvent, ShellEventSink, ShellIntegration, WindowHandle};

use super::panel_window::{APPBAR_CALLBACK, PanelWindow, SharedState};
use super::{last_error, wide};

const HSHELL_WINDOWCREATED: usize = 1;
const HSHELL_WINDOWDESTROYED: usize = 2;
/// Sent when a window's title or icon is redrawn by the shell.
const HSHELL_REDRAW: usize = 6;
const HSHELL_WINDOWREPLACED: usize = 13;
/// `HSHELL_HIGHBIT` variants (flash, rude activation) share the low bits.
const HSHELL_CODE_MASK: usize = 0x7FFF;

/// Translate a `SHELLHOOK` message into a lifecycle notification.
pub(super) fn shell_event(code: usize, lparam: isize) -> Option<ShellEvent> {
    let handle = WindowHandle::new(lparam as usize);
    match code & HSHELL_CODE_MASK {
        HSHELL_WINDOWCREATED => Some(ShellEvent::WindowCreated(handle)),
        HSHELL_WINDOWDESTROYED | HSHELL_WINDOWREPLACED => Some(ShellEvent::WindowDestroyed(handle)),
        HSHELL_REDRAW => Some(ShellEvent::TitleChanged(handle)),
        _ => None,
    }
}

fn appbar_data(hwnd: HWND) -> APPBARDATA {
    // SAFETY: APPBARDATA is plain data; all-zero is a valid value.
    let mut data: APPBARDATA = unsafe { mem::zeroed() };
    data.cbSize = mem::size_of::<APPBARDATA>() as u32;
    data.hWnd = hwnd;
    data.uCallbackMessage = APPBAR_CALLBACK;
    data
}

fn abe(edge: ScreenEdge) -> u32 {
    match edge {
        ScreenEdge::Left => ABE_LEFT,
        ScreenEdge::Top => ABE_TOP,
        ScreenEdge::Right => ABE_RIGHT,
        ScreenEdge::Bottom => ABE_BOTTOM,
    }
}

fn clamp_to_edge(rc: &mut RECT, edge: ScreenEdge, thickness: i32) {
    match edge {
        ScreenEdge::Left => rc.right = rc.left + thickness,
        ScreenEdge::Right => rc.left = rc.right - thickness,
        ScreenEdge::Top => rc.bottom = rc.top + thickness,
        ScreenEdge::Bottom => rc.top = rc.bottom - thickness,
    }
}

fn screen_rect() -> RECT {
    // SAFETY: metric queries without side effects.
    let (right, bottom) =
        unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
    RECT {
        left: 0,
        top: 0,
        right,
        bottom,
    }
}

/// The primary screen minus the taskbar and other app bars.
pub(super) fn primary_work_area() -> RECT {
    let mut rc = RECT {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };
    let out = (&raw mut rc).cast::<c_void>();
    // SAFETY: SPI_GETWORKAREA writes exactly one RECT through `out`.
    if unsafe { SystemParametersInfoW(SPI_GETWORKAREA, 0, out, 0) } != 0 {
        return rc;
    }
    warn!(
        error = %last_error("SystemParametersInfoW"),
        "work area unavailable; using the whole screen"
    );
    screen_rect()
}

/// Strip proposed to the shell. Once the bar is registered the work area
/// already excludes it, so only the vertical extent comes from `work`.
fn proposal(screen: RECT, work: RECT, edge: ScreenEdge, thickness: i32) -> RECT {
    let mut rc = match edge {
        ScreenEdge::Left | ScreenEdge::Right => RECT {
            left: screen.left,
            top: work.top,
            right: screen.right,
            bottom: work.bottom,
        },
        ScreenEdge::Top | ScreenEdge::Bottom => RECT {
            left: work.left,
            top: screen.top,
            right: work.right,
            bottom: screen.bottom,
        },
    };
    clamp_to_edge(&mut rc, edge, thickness);
    rc
}

/// Negotiate the strip with the shell and move the panel into it. Also runs
/// when the shell reports that other app bars moved.
pub(super) fn position_appbar(hwnd: HWND, edge: ScreenEdge, thickness: u32) -> RECT {
    let thickness = thickness as i32;
    let mut data = appbar_data(hwnd);
    data.uEdge = abe(edge);
    data.rc = proposal(screen_rect(), primary_work_area(), edge, thickness);

    // SAFETY: `data` is a fully initialized APPBARDATA for a registered bar.
    unsafe { SHAppBarMessage(ABM_QUERYPOS, &mut data) };
    // The shell may have shifted the proposal; keep our thickness.
    clamp_to_edge(&mut data.rc, edge, thickness);
    // SAFETY: as above.
    unsafe { SHAppBarMessage(ABM_SETPOS, &mut data) };

    let rc = data.rc;
    // SAFETY: `hwnd` is the live panel window.
    unsafe { MoveWindow(hwnd, rc.left, rc.top, rc.right - rc.left, rc.bottom - rc.top, 1) };
    debug!(
        ?edge,
        left = rc.left,
        top = rc.top,
        right = rc.right,
        bottom = rc.bottom,
        "app bar positioned"
    );
    rc
}

/// Shell integration bound to the panel window: app-bar registration and
/// the `SHELLHOOK` subscription both target it.
pub struct Win32Shell {
    hwnd: HWND,
    state: SharedState,
    registered: bool,
    hooked: bool,
}

impl Win32Shell {
    pub fn new(window: &PanelWindow) -> Self {
        Self {
            hwnd: window.hwnd(),
            state: window.state(),
            registered: false,
            hooked: false,
        }
    }
}

impl ShellIntegration for Win32Shell {
    fn reserve_edge(&mut self, edge: ScreenEdge, thickness: u32) -> Result<(), PlatformError> {
        if !self.registered {
            let mut data = appbar_data(self.hwnd);
            // SAFETY: `data` is fully initialized and names our window.
            if unsafe { SHAppBarMessage(ABM_NEW, &mut data) } == 0 {
                return Err(last_error("SHAppBarMessage"));
            }
            self.registered = true;
        }
        self.state.borrow_mut().appbar = Some((edge, thickness));
        position_appbar(self.hwnd, edge, thickness);
        Ok(())
    }

    fn release(&mut self) -> Result<(), PlatformError> {
        if !self.registered {
            return Ok(());
        }
        self.registered = false;
        self.state.borrow_mut().appbar = None;
        // An empty rect hands the strip back before the bar is removed.
        let mut data = appbar_data(self.hwnd);
        // SAFETY: `data` names a registered bar.
        unsafe {
            SHAppBarMessage(ABM_SETPOS, &mut data);
            SHAppBarMessage(ABM_REMOVE, &mut data);
        }
        debug!("app bar released");
        Ok(())
    }

    fn subscribe(&mut self, sink: ShellEventSink) -> Result<(), PlatformError> {
        let name = wide("SHELLHOOK");
        // SAFETY: `name` is NUL-terminated.
        let message = unsafe { RegisterWindowMessageW(name.as_ptr()) };
        if message == 0 {
            return Err(last_error("RegisterWindowMessageW"));
        }
        // SAFETY: `hwnd` is the live panel window.
        if unsafe { RegisterShellHookWindow(self.hwnd) } == 0 {
            return Err(last_error("RegisterShellHookWindow"));
        }
        self.hooked = true;
        let mut state = self.state.borrow_mut();
        state.shell_hook_message = message;
        state.shell_sink = Some(sink);
        Ok(())
    }
}

impl Drop for Win32Shell {
    fn drop(&mut self) {
        let _ = self.release();
        if self.hooked {
            // SAFETY: the window is still alive; it is destroyed after the shell.
            unsafe { DeregisterShellHookWindow(self.hwnd) };
            if let Ok(mut state) = self.state.try_borrow_mut() {
                state.shell_sink = None;
                state.shell_hook_message = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_codes_map_to_events() {
        let h = WindowHandle::new(0x40);
        assert_eq!(shell_event(1, 0x40), Some(ShellEvent::WindowCreated(h)));
        assert_eq!(shell_event(2, 0x40), Some(ShellEvent::WindowDestroyed(h)));
        assert_eq!(shell_event(6, 0x40), Some(ShellEvent::TitleChanged(h)));
        // HSHELL_FLASH carries the high bit on top of the redraw code.
        assert_eq!(shell_event(0x8006, 0x40), Some(ShellEvent::TitleChanged(h)));
        assert_eq!(shell_event(4, 0x40), None);
    }

    #[test]
    fn left_strip_spans_the_work_area_height() {
        let screen = RECT {
            left: 0,
            top: 0,
            right: 1920,
            bottom: 1080,
        };
        let work = RECT {
            left: 0,
            top: 0,
            right: 1920,
            bottom: 1040,
        };
        let rc = proposal(screen, work, ScreenEdge::Left, 96);
        assert_eq!((rc.left, rc.top, rc.right, rc.bottom), (0, 0, 96, 1040));

        // Our own reservation already pushed the work area to the right.
        let shrunk = RECT { left: 96, ..work };
        let rc = proposal(screen, shrunk, ScreenEdge::Left, 96);
        assert_eq!((rc.left, rc.right), (0, 96));
    }

    #[test]
    fn release_request_reserves_nothing() {
        let data = appbar_data(std::ptr::null_mut());
        assert_eq!(data.cbSize as usize, mem::size_of::<APPBARDATA>());
        assert_eq!(
            (data.rc.left, data.rc.top, data.rc.right, data.rc.bottom),
            (0, 0, 0, 0)
        );
    }

    #[test]
    fn strip_keeps_requested_thickness() {
        let mut rc = RECT {
            left: 0,
            top: 0,
            right: 1920,
            bottom: 1080,
        };
        clamp_to_edge(&mut rc, ScreenEdge::Left, 96);
        assert_eq!((rc.left, rc.right), (0, 96));
        rc.left = 40;
        clamp_to_edge(&mut rc, ScreenEdge::Left, 96);
        assert_eq!((rc.left, rc.right), (40, 136));
    }
}
