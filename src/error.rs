//! Error taxonomy for the panel.
//!
//! OS failures are converted into one of these types at the call site. None
//! of them is fatal once the panel is running: enumeration failures keep the
//! previous window list, activation failures reset the toggle state, and
//! setup failures fall back to polling.

use std::path::PathBuf;

use thiserror::Error;

use crate::platform::WindowHandle;

/// A single OS call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("{call} failed (os error {code})")]
    Call { call: &'static str, code: u32 },
    #[error("window {0} no longer exists")]
    WindowGone(WindowHandle),
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl PlatformError {
    pub fn call(call: &'static str, code: u32) -> Self {
        Self::Call { call, code }
    }
}

/// The OS refused to hand out the current window set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("window enumeration failed: {0}")]
pub struct EnumerationError(#[from] pub PlatformError);

/// Activating or minimizing a window failed, typically because the window
/// closed between the click and the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not activate window {handle}: {source}")]
pub struct ActivationError {
    pub handle: WindowHandle,
    #[source]
    pub source: PlatformError,
}

/// Startup integration with the shell was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("screen edge reservation rejected: {0}")]
    Reservation(PlatformError),
    #[error("shell notification subscription rejected: {0}")]
    Subscription(PlatformError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),
    #[error(transparent)]
    Activation(#[from] ActivationError),
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("window {0} is not on the panel")]
    UnknownWindow(WindowHandle),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
