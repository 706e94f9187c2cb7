//! Logging infrastructure for the Sage teachings assistant.
//!
//! Initializes the tracing subscriber for structured logging. All logs go to
//! stderr so stdout carries only answers and command output.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::error::{AppError, AppResult};

/// Options resolved from flags, environment, and the `logging` section.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Filter directive; falls back to `RUST_LOG`, then "info"
    pub level: Option<String>,

    /// Line format
    pub format: LogFormat,

    /// Disable colored output
    pub no_color: bool,
}

/// Build the env filter for the given directive.
fn build_filter(level: Option<&str>) -> AppResult<EnvFilter> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = level.unwrap_or(&default_level);

    EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", filter_str, e)))
}

/// Initialize the tracing subscriber with stderr output.
///
/// Pretty output is human-readable with optional ANSI colors; JSON output
/// emits one object per event for log collectors.
///
/// # Example
/// ```no_run
/// use sage_core::logging::{init_logging, LogOptions};
///
/// init_logging(&LogOptions::default()).expect("Failed to initialize logging");
/// ```
pub fn init_logging(options: &LogOptions) -> AppResult<()> {
    let env_filter = build_filter(options.level.as_deref())?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match options.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(!options.no_color && supports_color()),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

/// Check if stderr can render color.
fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    std::io::stderr().is_terminal()
}
