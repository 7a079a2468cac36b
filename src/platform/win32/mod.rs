//! Native backend for Windows.
//!
//! All calls happen on the thread that created the panel window. OS
//! callbacks (window procedure, shell hook) only push onto the shared
//! [`EventQueue`]; the controller runs from the event loop.

mod panel_window;
mod shell;
mod window_manager;

use std::ffi::c_void;
use std::time::Instant;

use tracing::info;
use windows_sys::Win32::Foundation::GetLastError;

use crate::config::Config;
use crate::controller::PanelController;
use crate::error::{PanelError, PlatformError};
use crate::event_loop::{ControlFlow, EventLoop, EventQueue};

use super::WindowHandle;

pub use panel_window::{MessagePump, PanelWindow, Win32PanelView};
pub use shell::Win32Shell;
pub use window_manager::Win32WindowManager;

/// Create the panel, dock it and run until the user closes it.
pub fn run(config: &Config) -> Result<(), PanelError> {
    let events = EventQueue::new();
    let window = PanelWindow::create(config, events.clone())?;
    let shell = Win32Shell::new(&window);

    let mut controller =
        PanelController::start(Win32WindowManager, shell, window.view(), config, &events);
    window.show();

    let mut event_loop = EventLoop::new(MessagePump::new(events), config.poll_interval());
    let result = event_loop.run(|_, event| {
        Ok(match event {
            None => {
                controller.on_idle(Instant::now());
                ControlFlow::Continue
            }
            Some(event) => controller.handle(event),
        })
    });

    controller.shutdown();
    drop(controller);
    window.destroy();
    info!("panel closed");
    result.map_err(PanelError::from)
}

fn hwnd(handle: WindowHandle) -> *mut c_void {
    handle.raw() as *mut c_void
}

fn handle_of(hwnd: *mut c_void) -> WindowHandle {
    WindowHandle::new(hwnd as usize)
}

fn last_error(call: &'static str) -> PlatformError {
    // SAFETY: reads the calling thread's last-error value.
    PlatformError::call(call, unsafe { GetLastError() })
}

/// NUL-terminated UTF-16 copy of `value`.
fn wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}
