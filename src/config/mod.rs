// Configuration module
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::readiness::{FailurePolicy, ReadinessOptions};

/// Console-side configuration, loaded from TOML. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub server: ServerSettings,
    pub readiness: ReadinessSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub base_url: String,
    /// Prefix in front of `/sqlresource` on the web tier.
    pub base_path: String,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            base_path: "/splice_web/webresources".to_string(),
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ServerSettings {
    /// Base URL plus base path, without a trailing slash.
    pub fn endpoint_base(&self) -> String {
        let url = self.base_url.trim_end_matches('/');
        let path = self.base_path.trim_matches('/');
        if path.is_empty() {
            url.to_string()
        } else {
            format!("{}/{}", url, path)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    Retry,
    Surface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
    pub interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    pub on_failure: OnFailure,
    pub failure_interval_ms: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            timeout_ms: None,
            on_failure: OnFailure::Retry,
            failure_interval_ms: 5_000,
        }
    }
}

impl ReadinessSettings {
    pub fn options(&self) -> ReadinessOptions {
        let policy = match self.on_failure {
            OnFailure::Retry => FailurePolicy::RetryAfter(Duration::from_millis(self.failure_interval_ms)),
            OnFailure::Surface => FailurePolicy::Surface,
        };
        let mut options =
            ReadinessOptions::new(Duration::from_millis(self.interval_ms)).with_failure_policy(policy);
        if let Some(timeout_ms) = self.timeout_ms {
            options = options.with_timeout(Duration::from_millis(timeout_ms));
        }
        options
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// "compact" or "json"
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ConsoleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.server.base_url).map_err(|e| {
            ConfigError::Invalid(format!("server.base_url '{}': {}", self.server.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "server.base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "server.base_url cannot carry a query string or fragment".to_string(),
            ));
        }
        if self.server.request_timeout_ms == 0 || self.server.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid("server timeouts must be greater than zero".to_string()));
        }
        if self.readiness.interval_ms == 0 {
            return Err(ConfigError::Invalid("readiness.interval_ms must be greater than zero".to_string()));
        }
        if self.readiness.on_failure == OnFailure::Retry && self.readiness.failure_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "readiness.failure_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.readiness.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("readiness.timeout_ms must be greater than zero".to_string()));
        }
        if !matches!(self.logging.format.to_lowercase().as_str(), "compact" | "json" | "jsonl") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be 'compact', 'json' or 'jsonl', got '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }
}
