//! Telemetry
//!
//! Logging configuration.

pub mod logging;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
