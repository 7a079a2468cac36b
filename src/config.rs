//! Runtime configuration.
//!
//! Defaults come from [`crate::constants`], can be overridden by a TOML file,
//! and finally by command-line flags in `main`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CLOSE_LABEL, ELLIPSIS, FIRST_WINDOW_ROW, ICON_SIZE, LABEL_PADDING, MIN_POLL_INTERVAL,
    PANEL_WIDTH, POLL_INTERVAL, ROW_HEIGHT, START_LABEL,
};
use crate::error::ConfigError;
use crate::text_layout::{LabelMetrics, TextLayoutEngine};
use crate::window_list::ReorderPolicy;

const APP_DIR: &str = "edgebar";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub panel: PanelSection,
    pub refresh: RefreshSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelSection {
    pub width: u32,
    pub row_height: u32,
    pub label_padding: u32,
    pub icon_size: u32,
    pub ellipsis: String,
    pub start_label: String,
    pub close_label: String,
}

impl Default for PanelSection {
    fn default() -> Self {
        Self {
            width: PANEL_WIDTH,
            row_height: ROW_HEIGHT,
            label_padding: LABEL_PADDING,
            icon_size: ICON_SIZE,
            ellipsis: ELLIPSIS.to_string(),
            start_label: START_LABEL.to_string(),
            close_label: CLOSE_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshSection {
    pub poll_interval_ms: u64,
    pub reorder: ReorderPolicy,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
            reorder: ReorderPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl Config {
    /// `<config dir>/edgebar/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Load `explicit` if given (it must exist), else the default file if it
    /// exists, else built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let panel = &self.panel;
        if panel.width == 0 {
            return Err(ConfigError::Invalid("panel.width must be positive".into()));
        }
        if panel.row_height == 0 {
            return Err(ConfigError::Invalid(
                "panel.row_height must be positive".into(),
            ));
        }
        if panel.ellipsis.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "panel.ellipsis must contain a visible marker".into(),
            ));
        }
        if panel.icon_size > panel.row_height {
            return Err(ConfigError::Invalid(format!(
                "panel.icon_size ({}) does not fit in a {} px row",
                panel.icon_size, panel.row_height
            )));
        }
        if self.poll_interval() < MIN_POLL_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "refresh.poll_interval_ms must be at least {}",
                MIN_POLL_INTERVAL.as_millis()
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.poll_interval_ms)
    }

    pub fn label_metrics(&self) -> LabelMetrics {
        LabelMetrics {
            button_width: self.panel.width,
            icon_width: self.panel.icon_size,
            padding: self.panel.label_padding,
        }
    }

    pub fn text_layout(&self) -> TextLayoutEngine {
        TextLayoutEngine::new(self.panel.ellipsis.clone(), self.label_metrics())
    }

    /// Vertical offset of window slot 0.
    pub fn list_offset(&self) -> u32 {
        FIRST_WINDOW_ROW * self.panel.row_height
    }
}
