use std::ffi::c_void;
use std::mem;

use windows_sys::Win32::Foundation::LPARAM;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP, SendInput, VK_LWIN,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, EnumWindows, GCLP_HICON, GCLP_HICONSM, GWL_EXSTYLE, GetClassLongPtrW,
    GetWindowLongPtrW, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
    ICON_BIG, ICON_SMALL, ICON_SMALL2, IsIconic, IsWindow, IsWindowVisible, SMTO_ABORTIFHUNG,
    SW_MINIMIZE, SW_RESTORE, SendMessageTimeoutW, SetForegroundWindow, ShowWindow, WM_GETICON,
    WS_EX_TOOLWINDOW,
};
use windows_sys::core::BOOL;

use crate::error::PlatformError;
use crate::platform::{Icon, ProcessId, WindowHandle, WindowManager, WindowRecord};

use super::{handle_of, hwnd, last_error};

/// Icon queries go to the owning window's thread; a hung application must
/// not stall the panel.
const ICON_QUERY_TIMEOUT_MS: u32 = 100;

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32WindowManager;

impl Win32WindowManager {
    fn ensure_alive(&self, handle: WindowHandle) -> Result<*mut c_void, PlatformError> {
        let raw = hwnd(handle);
        // SAFETY: IsWindow accepts any value and only reports validity.
        if handle.is_null() || unsafe { IsWindow(raw) } == 0 {
            return Err(PlatformError::WindowGone(handle));
        }
        Ok(raw)
    }

    fn query_icon(raw: *mut c_void, kind: u32) -> Option<Icon> {
        let mut result: usize = 0;
        // SAFETY: WM_GETICON carries no pointers; the result slot outlives the call.
        let ok = unsafe {
            SendMessageTimeoutW(
                raw,
                WM_GETICON,
                kind as usize,
                0,
                SMTO_ABORTIFHUNG,
                ICON_QUERY_TIMEOUT_MS,
                &mut result,
            )
        };
        (ok != 0 && result != 0).then(|| Icon::from_raw(result))
    }

    fn class_icon(raw: *mut c_void, index: i32) -> Option<Icon> {
        // SAFETY: reads a class field of a live window.
        let icon = unsafe { GetClassLongPtrW(raw, index) };
        (icon != 0).then(|| Icon::from_raw(icon))
    }
}

unsafe extern "system" fn collect_window(raw: *mut c_void, data: LPARAM) -> BOOL {
    // SAFETY: `data` is the `Vec` passed to EnumWindows below, alive for the
    // whole enumeration.
    let records = unsafe { &mut *(data as *mut Vec<WindowRecord>) };
    // SAFETY: `raw` is supplied by EnumWindows.
    if unsafe { IsWindowVisible(raw) } == 0 {
        return 1;
    }
    if let Some(title) = window_title(raw)
        && !title.is_empty()
    {
        records.push(WindowRecord::new(handle_of(raw), title));
    }
    1
}

fn window_title(raw: *mut c_void) -> Option<String> {
    // SAFETY: `raw` may have died already; both calls then return 0.
    let len = unsafe { GetWindowTextLengthW(raw) };
    if len <= 0 {
        return None;
    }
    let mut buf = vec![0u16; len as usize + 1];
    // SAFETY: `buf` holds `len + 1` units including the terminator.
    let copied = unsafe { GetWindowTextW(raw, buf.as_mut_ptr(), buf.len() as i32) };
    if copied <= 0 {
        return None;
    }
    buf.truncate(copied as usize);
    Some(String::from_utf16_lossy(&buf))
}

impl WindowManager for Win32WindowManager {
    fn enumerate_top_level_windows(&self) -> Result<Vec<WindowRecord>, PlatformError> {
        let mut records: Vec<WindowRecord> = Vec::new();
        // SAFETY: the callback only touches `records` through the pointer.
        let ok = unsafe {
            EnumWindows(
                Some(collect_window),
                &mut records as *mut Vec<WindowRecord> as LPARAM,
            )
        };
        if ok == 0 {
            return Err(last_error("EnumWindows"));
        }
        Ok(records)
    }

    fn is_tool_window(&self, handle: WindowHandle) -> Result<bool, PlatformError> {
        let raw = self.ensure_alive(handle)?;
        // SAFETY: `raw` was a live window an instant ago; a stale handle yields 0.
        let style = unsafe { GetWindowLongPtrW(raw, GWL_EXSTYLE) } as u32;
        Ok(style & WS_EX_TOOLWINDOW != 0)
    }

    fn icon(&self, handle: WindowHandle) -> Option<Icon> {
        let raw = self.ensure_alive(handle).ok()?;
        Self::query_icon(raw, ICON_SMALL)
            .or_else(|| Self::query_icon(raw, ICON_SMALL2))
            .or_else(|| Self::query_icon(raw, ICON_BIG))
            .or_else(|| Self::class_icon(raw, GCLP_HICONSM))
            .or_else(|| Self::class_icon(raw, GCLP_HICON))
    }

    fn is_minimized(&self, handle: WindowHandle) -> Result<bool, PlatformError> {
        let raw = self.ensure_alive(handle)?;
        // SAFETY: plain state query.
        Ok(unsafe { IsIconic(raw) } != 0)
    }

    fn restore(&mut self, handle: WindowHandle) -> Result<(), PlatformError> {
        let raw = self.ensure_alive(handle)?;
        // The return value is the previous visibility, not an error flag.
        // SAFETY: plain state change on a live window.
        unsafe { ShowWindow(raw, SW_RESTORE) };
        Ok(())
    }

    fn minimize(&mut self, handle: WindowHandle) -> Result<(), PlatformError> {
        let raw = self.ensure_alive(handle)?;
        // SAFETY: plain state change on a live window.
        unsafe { ShowWindow(raw, SW_MINIMIZE) };
        Ok(())
    }

    fn bring_to_foreground(&mut self, handle: WindowHandle) -> Result<(), PlatformError> {
        let raw = self.ensure_alive(handle)?;
        // SAFETY: plain z-order changes on a live window.
        unsafe {
            if SetForegroundWindow(raw) == 0 {
                return Err(last_error("SetForegroundWindow"));
            }
            BringWindowToTop(raw);
        }
        Ok(())
    }

    fn owner_process_id(&self, handle: WindowHandle) -> Result<ProcessId, PlatformError> {
        let raw = self.ensure_alive(handle)?;
        let mut pid: u32 = 0;
        // SAFETY: `pid` outlives the call.
        let thread = unsafe { GetWindowThreadProcessId(raw, &mut pid) };
        if thread == 0 {
            return Err(last_error("GetWindowThreadProcessId"));
        }
        Ok(ProcessId(pid))
    }

    fn press_start_key(&mut self) -> Result<(), PlatformError> {
        let key = |flags| INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VK_LWIN,
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        let inputs = [key(0), key(KEYEVENTF_KEYUP)];
        // SAFETY: `inputs` is a properly sized array of initialized INPUTs.
        let sent = unsafe {
            SendInput(
                inputs.len() as u32,
                inputs.as_ptr(),
                mem::size_of::<INPUT>() as i32,
            )
        };
        if sent as usize != inputs.len() {
            return Err(last_error("SendInput"));
        }
        Ok(())
    }
}
