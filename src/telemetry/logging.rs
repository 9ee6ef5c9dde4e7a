//! Logging configuration and initialization.
//!
//! Provides logging setup with support for:
//! - Environment variable (RUST_LOG) configuration
//! - The `[logging]` section of the configuration file
//! - Multiple output formats (pretty, compact, json)

use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Logging configuration from the `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format: pretty, compact, json
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl LogConfig {
    /// Creates a new LogConfig with default values.
    pub fn new() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes the logging system.
///
/// Priority:
/// 1. RUST_LOG environment variable (if set)
/// 2. config parameter (if provided)
/// 3. Default: info level, pretty format
///
/// Calling this more than once keeps the first subscriber.
pub fn init_logging(config: Option<&LogConfig>) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if let Some(cfg) = config {
        let level = parse_level(&cfg.level);
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::new("info")
    };

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> =
        match config.map(|c| c.format.as_str()) {
            Some("json") => tracing_subscriber::fmt::layer().json().boxed(),
            Some("compact") => tracing_subscriber::fmt::layer().compact().boxed(),
            _ => tracing_subscriber::fmt::layer().boxed(),
        };

    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Parses a log level string into a Level.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Whether `level` names a known log level.
pub(crate) fn is_known_level(level: &str) -> bool {
    matches!(
        level.to_lowercase().as_str(),
        "error" | "warn" | "info" | "debug" | "trace"
    )
}
