// src/logging/mod.rs

// Logging setup for the sqlbind binary.
//
// Library code logs through the `log` facade. `tracing-subscriber` (with its
// `tracing-log` bridge) picks those records up and formats them.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// timestamp LEVEL target - message
    Compact,
    /// JSON Lines
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Builds the filter from the configured level plus quieter defaults for the
/// HTTP stack. `RUST_LOG`, when set, wins.
pub fn build_env_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    if let Ok(from_env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        if !from_env.trim().is_empty() {
            return EnvFilter::try_new(&from_env)
                .map_err(|e| ConfigError::Invalid(format!("invalid RUST_LOG '{}': {}", from_env, e)));
        }
    }

    let mut directives = vec![level.to_string()];
    for (target, lvl) in [("hyper", "warn"), ("hyper_util", "warn"), ("reqwest", "warn"), ("rustls", "warn")] {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| ConfigError::Invalid(format!("invalid log filter '{}': {}", filter_str, e)))
}

pub fn init_logging(settings: &LoggingSettings) -> Result<(), ConfigError> {
    let filter = build_env_filter(&settings.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match LogFormat::parse(&settings.format) {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| ConfigError::Invalid(format!("logging already initialised: {}", e)))
}
