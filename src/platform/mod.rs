//! Capabilities the panel consumes from the OS and the UI toolkit.
//!
//! The synchronization core never calls the OS directly. It talks to a
//! [`WindowManager`] for the window set and window state, a
//! [`ShellIntegration`] for the screen-edge reservation and lifecycle
//! notifications, and a [`PanelView`] for drawing. `scripted` provides an
//! in-memory implementation of all three; `win32` is the real backend.

use std::fmt;

use crate::entry::ButtonEntry;
use crate::error::PlatformError;

pub mod scripted;
#[cfg(windows)]
pub mod win32;

/// Opaque OS identifier of a top-level window.
///
/// The panel never owns the window behind a handle; a handle that stops
/// showing up in enumeration is simply removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowHandle(usize);

impl WindowHandle {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }

    /// The null handle never identifies a real window.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Borrowed OS icon handle. Fetched once per entry and never destroyed by
/// the panel, since the icon belongs to the window that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Icon(usize);

impl Icon {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }
}

/// One result of window enumeration: a visible top-level window with the
/// title it reported at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub handle: WindowHandle,
    pub title: String,
}

impl WindowRecord {
    pub fn new(handle: WindowHandle, title: impl Into<String>) -> Self {
        Self {
            handle,
            title: title.into(),
        }
    }
}

/// Window lifecycle notification delivered by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent {
    WindowCreated(WindowHandle),
    WindowDestroyed(WindowHandle),
    TitleChanged(WindowHandle),
}

impl ShellEvent {
    pub fn handle(self) -> WindowHandle {
        match self {
            Self::WindowCreated(h) | Self::WindowDestroyed(h) | Self::TitleChanged(h) => h,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEdge {
    Left,
    Top,
    Right,
    Bottom,
}

/// A clickable row of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Row {
    StartKey,
    Close,
    Window(WindowHandle),
}

/// Row drawn at `offset`, given each drawn row's top edge. Offsets between
/// drawn rows hit nothing.
pub fn row_at(
    rows: impl IntoIterator<Item = (Row, i32)>,
    row_height: i32,
    offset: i32,
) -> Option<Row> {
    rows.into_iter()
        .find(|&(_, top)| offset >= top && offset < top + row_height)
        .map(|(row, _)| row)
}

/// Callback the shell invokes for every lifecycle notification. It always
/// runs on the event thread.
pub type ShellEventSink = Box<dyn FnMut(ShellEvent)>;

/// Window-manager capability.
pub trait WindowManager {
    /// Visible top-level windows with a non-empty title, in z-order.
    fn enumerate_top_level_windows(&self) -> Result<Vec<WindowRecord>, PlatformError>;

    /// Whether the window carries the auxiliary tool-window style.
    fn is_tool_window(&self, handle: WindowHandle) -> Result<bool, PlatformError>;

    fn icon(&self, handle: WindowHandle) -> Option<Icon>;

    fn is_minimized(&self, handle: WindowHandle) -> Result<bool, PlatformError>;

    fn restore(&mut self, handle: WindowHandle) -> Result<(), PlatformError>;

    fn minimize(&mut self, handle: WindowHandle) -> Result<(), PlatformError>;

    fn bring_to_foreground(&mut self, handle: WindowHandle) -> Result<(), PlatformError>;

    fn owner_process_id(&self, handle: WindowHandle) -> Result<ProcessId, PlatformError>;

    /// Synthesize one press and release of the key that opens the start menu.
    fn press_start_key(&mut self) -> Result<(), PlatformError>;
}

/// Shell-integration capability.
pub trait ShellIntegration {
    /// Claim a strip of `thickness` pixels along `edge` of the primary screen.
    fn reserve_edge(&mut self, edge: ScreenEdge, thickness: u32) -> Result<(), PlatformError>;

    /// Give the reserved strip back. Calling it without a reservation, or
    /// twice, is a no-op.
    fn release(&mut self) -> Result<(), PlatformError>;

    fn subscribe(&mut self, sink: ShellEventSink) -> Result<(), PlatformError>;
}

/// Measures rendered text width in pixels for the active font.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> u32;
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn text_width(&self, text: &str) -> u32 {
        (**self).text_width(text)
    }
}

impl<T: TextMeasure + ?Sized> TextMeasure for &mut T {
    fn text_width(&self, text: &str) -> u32 {
        (**self).text_width(text)
    }
}

/// Toolkit capability: draws the rows the controller tells it about.
pub trait PanelView: TextMeasure {
    /// Draw a static command row.
    fn show_command(&mut self, row: Row, label: &str, y: i32);

    /// Create or update the button for `entry` at vertical offset `y`.
    fn show_entry(&mut self, entry: &ButtonEntry, y: i32);

    fn remove_entry(&mut self, handle: WindowHandle);

    /// Hover feedback. Purely cosmetic.
    fn set_highlighted(&mut self, row: Row, highlighted: bool);

    fn redraw(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display_is_hex() {
        assert_eq!(WindowHandle::new(0x1a2b).to_string(), "0x1a2b");
        assert!(WindowHandle::new(0).is_null());
        assert!(!WindowHandle::new(1).is_null());
    }

    #[test]
    fn shell_event_exposes_handle() {
        let h = WindowHandle::new(9);
        assert_eq!(ShellEvent::WindowCreated(h).handle(), h);
        assert_eq!(ShellEvent::WindowDestroyed(h).handle(), h);
        assert_eq!(ShellEvent::TitleChanged(h).handle(), h);
    }

    #[test]
    fn row_at_hits_only_drawn_bands() {
        let h = WindowHandle::new(5);
        let rows = [(Row::StartKey, 0), (Row::Close, 32), (Row::Window(h), 96)];
        assert_eq!(row_at(rows, 32, 0), Some(Row::StartKey));
        assert_eq!(row_at(rows, 32, 63), Some(Row::Close));
        assert_eq!(row_at(rows, 32, 64), None);
        assert_eq!(row_at(rows, 32, 127), Some(Row::Window(h)));
        assert_eq!(row_at(rows, 32, 128), None);
        assert_eq!(row_at(rows, 32, -1), None);
    }

    struct Fixed;
    impl TextMeasure for Fixed {
        fn text_width(&self, text: &str) -> u32 {
            text.chars().count() as u32 * 10
        }
    }

    #[test]
    fn blanket_impl_for_refs_works() {
        let m = Fixed;
        let r = &m;
        assert_eq!(r.text_width("abc"), 30);
        assert_eq!((&r).text_width("ab"), 20);
    }
}
