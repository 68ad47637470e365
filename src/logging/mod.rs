//! Logging and observability
//!
//! Structured logging with the `tracing` stack:
//! - Console output, plain or JSON
//! - Configurable log levels (`RUST_LOG` aware)
//! - Local file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use veil::logging::init_logging;
//! use veil::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Run starting");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};
