//! Structured logging initialization
//!
//! Console logging always; optional rotated file logging; optional JSON
//! formatting for log shipping. Patient identifiers and key material are
//! never logged: log call sites carry pseudonymous digests only.

use crate::config::LoggingConfig;
use crate::domain::{Result, VeilError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Guard that must stay alive for the duration of the program
///
/// Dropping the guard flushes and stops the background log writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber
///
/// # Arguments
///
/// * `log_level` - Base level filter (trace, debug, info, warn, error);
///   overridable per-module via `RUST_LOG`
/// * `config` - Logging configuration
///
/// # Errors
///
/// Returns an error if the subscriber is already set or the log
/// directory cannot be used.
pub fn init_logging(log_level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("veil={log_level},warn")));

    let (file_layer, file_guard) = if config.local_enabled {
        let appender = match config.local_rotation.as_str() {
            "hourly" => tracing_appender::rolling::hourly(&config.local_path, "veil.log"),
            "never" => tracing_appender::rolling::never(&config.local_path, "veil.log"),
            _ => tracing_appender::rolling::daily(&config.local_path, "veil.log"),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    let init_result = if config.json_format {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    init_result
        .map_err(|e| VeilError::Configuration(format!("Failed to initialize logging: {e}")))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_console_only() {
        let config = LoggingConfig {
            local_enabled: false,
            local_path: String::new(),
            local_rotation: "daily".to_string(),
            json_format: false,
        };

        // First initialization in the test process wins; a second call
        // must fail cleanly rather than panic.
        let first = init_logging("info", &config);
        let second = init_logging("info", &config);
        assert!(first.is_ok() || second.is_err());
    }
}
