//! HTTP transport for resource fetches.
//!
//! Resource handles only need "GET this URL and give me JSON back", so the
//! transport is a trait object. [`HttpTransport`] is the production
//! implementation over `reqwest`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

use crate::error::{ConfigError, FetchError};

#[cfg(test)]
pub(crate) mod mock;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a single GET and decodes the body as JSON. No retries.
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        debug!("[SQLRESOURCE_HTTP] GET {}", url);
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!("[SQLRESOURCE_HTTP] Transport error for {}: {}", url, e);
                FetchError::Transport {
                    url: url.to_string(),
                    source: Box::new(e),
                }
            })?;

        let status = response.status();
        debug!(
            "[SQLRESOURCE_HTTP] Response received: status={} duration_ms={}",
            status,
            start.elapsed().as_millis()
        );

        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        if !status.is_success() {
            warn!("[SQLRESOURCE_HTTP] Server error: status={} url={}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
