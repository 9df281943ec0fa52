//! Logging
//!
//! `tracing-subscriber` setup for hosts that embed the credential controller.
//! The crate itself only emits `tracing` events; installing a subscriber is
//! the host's choice.

use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ConfigurationError, TppError, TppResult};

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = TppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(TppError::Configuration(ConfigurationError::InvalidConfig {
                message: format!("unknown log level: {}", other),
            })),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for development.
    Pretty,
    /// One JSON object per event.
    Json,
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level, applied on top of `RUST_LOG` directives.
    pub level: LogLevel,
    pub format: LogFormat,
    pub include_target: bool,
    pub include_file_line: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            include_target: true,
            include_file_line: false,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    pub fn with_file_line(mut self, include: bool) -> Self {
        self.include_file_line = include;
        self
    }

    /// Install a global subscriber with this configuration.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init(self) -> TppResult<()> {
        let filter = EnvFilter::from_default_env().add_directive(LevelFilter::from(self.level).into());

        let result = match self.format {
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(self.include_target)
                        .with_file(self.include_file_line)
                        .with_line_number(self.include_file_line),
                )
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(self.include_target))
                .try_init(),
            LogFormat::Compact => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_target(self.include_target))
                .try_init(),
        };

        result.map_err(|e| {
            TppError::Configuration(ConfigurationError::InvalidConfig {
                message: format!("failed to install log subscriber: {}", e),
            })
        })
    }
}
