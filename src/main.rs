#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use indoc::indoc;
use tracing::{error, info};

use edgebar::config::{Config, LogLevel};
use edgebar::error::PanelError;
use edgebar::tracing_sub;
use edgebar::window_list::ReorderPolicy;

const AFTER_HELP: &str = indoc! {"
    Configuration is read from <config dir>/edgebar/config.toml when it
    exists. Flags override values from the file.

    Clicking a window row brings it to the front; clicking a window of the
    application brought forward last minimizes it instead. Drag one window
    row onto another to swap them.
"};

#[derive(Parser, Debug)]
#[command(
    name = "edgebar",
    version = env!("CARGO_PKG_VERSION"),
    about = "Vertical taskbar docked to the left edge of the primary screen",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Configuration file to load instead of the default location.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long = "print-config")]
    print_config: bool,

    /// Fallback refresh interval in milliseconds.
    #[arg(long = "poll-ms", value_name = "MILLIS")]
    poll_ms: Option<u64>,

    /// trace, debug, info, warn or error.
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Append logs to this file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Whether manual row order survives windows opening and closing
    /// ("preserve") or is rebuilt in first-seen order ("reset").
    #[arg(long = "reorder", value_name = "POLICY")]
    reorder: Option<ReorderPolicy>,
}

impl Cli {
    fn resolve_config(&self) -> Result<Config, PanelError> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        if let Some(ms) = self.poll_ms {
            config.refresh.poll_interval_ms = ms;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(path) = &self.log_file {
            config.logging.file = Some(path.clone());
        }
        if let Some(policy) = self.reorder {
            config.refresh.reorder = policy;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "edgebar failed");
            eprintln!("edgebar: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, PanelError> {
    let config = cli.resolve_config()?;
    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    tracing_sub::init(config.logging.level, config.logging.file.as_deref())?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        poll_ms = config.refresh.poll_interval_ms,
        reorder = %config.refresh.reorder,
        "starting"
    );
    launch(&config)
}

#[cfg(windows)]
fn launch(config: &Config) -> Result<ExitCode, PanelError> {
    edgebar::platform::win32::run(config)?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(not(windows))]
fn launch(_config: &Config) -> Result<ExitCode, PanelError> {
    error!("no supported shell to dock to on this platform");
    eprintln!("edgebar: only Windows is supported");
    Ok(ExitCode::from(2))
}
