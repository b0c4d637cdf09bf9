//! Logging for the varnishtest binary.
//!
//! Colored stderr plus a plain log file, installed at most once. Stdout is
//! left alone so the printed base URL can be captured by scripts.

use crate::error::CliError;

use common::ErrorLocation;

use std::io::stderr;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use humantime::format_rfc3339_millis;
use log::{LevelFilter, info, warn};

static INSTALL: Once = Once::new();
static REQUESTED: AtomicBool = AtomicBool::new(false);

const LOG_FILE_NAME: &str = "varnishtest.log";

/// Install the global logger.
///
/// Only the first call does anything; later calls warn and return Ok.
///
/// # Errors
///
/// Returns [`CliError::Logger`] if the log file cannot be created or another
/// global logger is already installed.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), CliError> {
    if REQUESTED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized, keeping the first configuration");
        return Ok(());
    }

    let mut result = Ok(());
    INSTALL.call_once(|| {
        result = install(log_dir, level);
    });

    if result.is_ok() {
        info!("Logging at {level} to stderr and {}", log_dir.join(LOG_FILE_NAME).display());
    }
    result
}

#[track_caller]
fn install(log_dir: &Path, level: LevelFilter) -> Result<(), CliError> {
    let path = log_dir.join(LOG_FILE_NAME);
    let log_file = fern::log_file(&path).map_err(|e| CliError::Logger {
        message: format!("Failed to create log file {}: {e}", path.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let colors = ColoredLevelConfig::new()
        .trace(Color::BrightBlack)
        .debug(Color::Cyan)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    // Source locations go to the file only.
    let terminal = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {:>5} {message}",
                format_rfc3339_millis(SystemTime::now()),
                colors.color(record.level()),
            ))
        })
        .chain(stderr());

    let file = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:>5} {} [{}:{}] {message}",
                format_rfc3339_millis(SystemTime::now()),
                record.level(),
                record.target(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
            ))
        })
        .chain(log_file);

    Dispatch::new()
        .level(level)
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(|e| CliError::Logger {
            message: format!("Failed to install logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
