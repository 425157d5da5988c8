use std::time::Duration;

use thiserror::Error;

use crate::structs::ResultShape;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Caller supplied the wrong placeholder set, or a template could not be parsed.
/// Raised before any request is issued and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("missing value for placeholder ':{0}'")]
    MissingPlaceholder(String),

    #[error("parameter '{0}' is not a placeholder of this resource")]
    UnexpectedPlaceholder(String),

    #[error("malformed template: {0}")]
    MalformedTemplate(String),
}

/// Transport or decode failure for a single request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("server returned status {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected {expected} result from {url}, got {found}")]
    Shape {
        url: String,
        expected: ResultShape,
        found: &'static str,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. }
            | FetchError::Shape { url, .. } => url,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("cluster not ready after {attempts} attempt(s) in {elapsed:?}")]
    Timeout { attempts: u32, elapsed: Duration },

    #[error("readiness probe failed on attempt {attempts}: {source}")]
    Probe {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("readiness check cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl ReadinessError {
    /// Probe failures caused by transport or decoding can be retried by a new session.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReadinessError::Probe { source, .. } if matches!(**source, Error::Fetch(_)))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
