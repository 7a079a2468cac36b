//! Shared crate-wide constants.

use std::time::Duration;

/// Width of the docked panel in pixels. This is also the width reserved from
/// the OS through the app-bar mechanism.
pub const PANEL_WIDTH: u32 = 96;

/// Height of every row (static commands and window buttons) in pixels.
pub const ROW_HEIGHT: u32 = 32;

/// Number of static command rows at the top of the panel ("start key" and
/// "close").
pub const STATIC_ROWS: u32 = 2;

/// Row index of the first window button.
///
/// One empty separator row sits between the static commands and the window
/// list, so window slot 0 is drawn at `FIRST_WINDOW_ROW * ROW_HEIGHT`.
pub const FIRST_WINDOW_ROW: u32 = STATIC_ROWS + 1;

/// Horizontal space kept free around a label, in pixels.
pub const LABEL_PADDING: u32 = 15;

/// Edge length of the window icon drawn at the left of a button, in pixels.
/// Only reserved from the label budget when the entry actually has an icon.
pub const ICON_SIZE: u32 = 16;

/// Marker appended to truncated labels.
pub const ELLIPSIS: &str = "...";

/// Fallback refresh cadence. Shell notifications are the primary trigger;
/// the poll only catches what they miss.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Lower bound accepted for a configured poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const START_LABEL: &str = "Start";
pub const CLOSE_LABEL: &str = "Close";
