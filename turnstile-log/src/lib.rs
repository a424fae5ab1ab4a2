//! Logging setup for turnstile.
//!
//! Every turnstile crate logs through the `tracing` macros. This crate owns the
//! one-time subscriber installation for the process: level filtering, output
//! format and destination. Defaults to JSON lines on STDOUT at INFO level.
//!
//! # Examples
//!
//! ```no_run
//! use turnstile_log::*;
//!
//! let _guard = LogConfig::from_env()
//!     .and_then(LogConfig::init)
//!     .expect("logging");
//! info!("gatekeeper started");
//! ```
//!
//! # Environment Variables
//!
//! - `TURNSTILE_LOG_LEVEL=trace|debug|info|warn|error` - Set log level
//! - `TURNSTILE_LOG_FORMAT=json|plain|pretty|compact` - Set output format
//! - `RUST_LOG` - Full filter directive, overrides the level when set

use serde::Deserialize;
use std::env;
use std::io;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing::{Level, debug, error, info, info_span, trace, warn};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log file could not be opened.
    #[error("Failed to open log file: {0}")]
    Io(#[from] io::Error),

    /// The filter directive did not parse.
    #[error("Invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),

    /// An environment override held a value that does not parse.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, accepting `warning` as an alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Directive string for `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured, machine-readable (default)
    Json,
    /// Simple single-line text
    Plain,
    /// Multi-line, for development
    Pretty,
    /// Minimal output
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "plain" => Some(LogFormat::Plain),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Output destination for log lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Append to a single file
    File(String),
}

/// Logging configuration.
///
/// Deserializes from the `[log]` table of the gatekeeper config file:
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "compact"
/// output = { file = "/var/log/turnstile.log" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Include target (module path)
    pub targets: bool,
    /// Include thread IDs
    pub thread_ids: bool,
    /// ANSI colors, ignored for JSON
    pub colors: bool,
    /// Custom filter directive (overrides `level` and `RUST_LOG`)
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            targets: true,
            thread_ids: false,
            colors: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `TURNSTILE_LOG_LEVEL` and `TURNSTILE_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, LogError> {
        Self::default().merge_env()
    }

    /// Apply `TURNSTILE_LOG_*` overrides on top of an existing config.
    pub fn merge_env(self) -> Result<Self, LogError> {
        self.merge_vars(|key| env::var(key).ok())
    }

    fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, LogError> {
        if let Some(value) = var("TURNSTILE_LOG_LEVEL") {
            self.level = LogLevel::parse(&value).ok_or(LogError::InvalidEnv {
                var: "TURNSTILE_LOG_LEVEL",
                value,
            })?;
        }
        if let Some(value) = var("TURNSTILE_LOG_FORMAT") {
            self.format = LogFormat::parse(&value).ok_or(LogError::InvalidEnv {
                var: "TURNSTILE_LOG_FORMAT",
                value,
            })?;
        }
        Ok(self)
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// Set a filter directive such as `"turnstile_session=debug,hyper=info"`.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, LogError> {
        match &self.filter {
            Some(directive) => {
                EnvFilter::try_new(directive).map_err(|e| LogError::Filter(e.to_string()))
            }
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))),
        }
    }

    /// Install the global subscriber.
    ///
    /// The returned guard flushes buffered lines on drop and must be held for
    /// the lifetime of the process.
    pub fn init(self) -> Result<WorkerGuard, LogError> {
        let filter = self.env_filter()?;

        let (writer, guard) = match &self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                tracing_appender::non_blocking(file)
            }
        };

        let registry = tracing_subscriber::registry().with(filter);
        let result = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids),
                )
                .try_init(),
            LogFormat::Plain => registry
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_ansi(self.colors),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_ansi(self.colors),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_ansi(self.colors),
                )
                .try_init(),
        };

        result.map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;
        Ok(guard)
    }
}
