//! Logging configuration for Tuning Lab.
//!
//! Logs go to stderr by default. When a log file is configured they are
//! written there instead, without ANSI colors. Either sink can emit plain
//! text or JSON lines.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging from the `[logging]` section.
///
/// Falls back to stderr when the log file cannot be created.
pub fn init(config: &LoggingConfig) {
    match &config.file {
        Some(path) => match open_log_file(path) {
            Ok(file) => init_file_logging(file, config.format),
            Err(e) => {
                eprintln!("Warning: Could not open log file {}: {e}", path.display());
                init_stderr_logging(config.format);
            }
        },
        None => init_stderr_logging(config.format),
    }
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Initializes logging to an already opened file.
fn init_file_logging(file: File, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(file)
        .with_ansi(false); // No ANSI colors in file output

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Opens (appending) the log file, creating its parent directory.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::OpenOptions::new().create(true).append(true).open(path)
}

/// Returns the default path for a log file.
///
/// Uses XDG state directory on Linux (`~/.local/state/tuning-lab/tuning-lab.log`),
/// or falls back to config directory on other platforms.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("tuning-lab").join("tuning-lab.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tuning-lab").join("tuning-lab.log");
    }

    std::env::temp_dir().join("tuning-lab.log")
}
