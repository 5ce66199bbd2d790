// Tracing log adapter - Console and diagnostic-file logging using tracing

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::domain::errors::*;
use crate::DIAGNOSTIC_TARGET;

/// Console filter: `RUST_LOG` when set, else `level`; diagnostics never reach the console
pub fn console_filter(level: &str) -> Result<EnvFilter, DomainError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| DomainError::Config(format!("Invalid log level '{}': {}", level, e)))?,
    };
    let silence = format!("{}=off", DIAGNOSTIC_TARGET)
        .parse()
        .map_err(|e| DomainError::Config(format!("Invalid log directive: {}", e)))?;
    Ok(filter.add_directive(silence))
}

fn open_log_file(path: &Path) -> Result<File, DomainError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| DomainError::Fs(format!("Failed to open log {}: {}", path.display(), e)))
}

/// Install the global subscriber.
///
/// The console layer shows user-facing events; the file layer, when a path is
/// given, records everything at debug including raw encoder output.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<(), DomainError> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter(level)?);

    let file = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?))
                .with_filter(LevelFilter::DEBUG),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| DomainError::Config(format!("Logging already initialized: {}", e)))
}
