//! HTTP client for a Symbol REST node

use crate::{
    pagination::PageSource,
    retry::{RetryConfig, RetryStrategy},
    types::Page,
    Error, Result, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECONDS,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Node connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Base URL, e.g. `http://node.example:3000`
    pub url: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Page size requested from paged endpoints
    pub page_size: u32,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

/// Read-only client for one node
#[derive(Debug, Clone)]
pub struct NodeClient {
    config: NodeConfig,
    base_url: String,
    http: Client,
    retry: RetryStrategy,
}

impl NodeClient {
    /// Create client, validating the settings
    pub fn new(config: NodeConfig) -> Result<Self> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "node url must start with http:// or https://: '{}'",
                config.url
            )));
        }
        if config.timeout_seconds == 0 {
            return Err(Error::Config("timeout_seconds must be positive".to_string()));
        }
        if config.page_size == 0 {
            return Err(Error::Config("page_size must be positive".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let retry = RetryStrategy::new(config.retry.clone());

        Ok(Self {
            config,
            base_url,
            http,
            retry,
        })
    }

    /// Settings in use
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON document, retrying transient failures
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<T> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let body = self
            .retry
            .execute(|| self.get_once(path, params), path, cancel)
            .await?;

        serde_json::from_str(&body).map_err(|e| Error::Decode(format!("{}: {}", path, e)))
    }

    async fn get_once(&self, path: &str, params: &[(String, String)]) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, ?params, "GET");

        let response = self
            .http
            .get(&url)
            .query(params)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.map_transport(e, path))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Api {
                status_code: status.as_u16(),
                message,
            });
        }

        response.text().await.map_err(|e| self.map_transport(e, path))
    }

    fn map_transport(&self, err: reqwest::Error, path: &str) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                seconds: self.config.timeout_seconds,
                operation: format!("GET {}", path),
            }
        } else {
            Error::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl PageSource for NodeClient {
    async fn fetch_page(
        &self,
        path: &str,
        params: &[(String, String)],
        page_number: u32,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> Result<Page<Value>> {
        let mut query = params.to_vec();
        query.push(("pageSize".to_string(), page_size.to_string()));
        query.push(("pageNumber".to_string(), page_number.to_string()));

        self.get_json(path, &query, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = NodeClient::new(NodeConfig {
            url: "http://node.example:3000/".to_string(),
            ..NodeConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://node.example:3000");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bad_url = NodeConfig {
            url: "node.example:3000".to_string(),
            ..NodeConfig::default()
        };
        assert!(matches!(NodeClient::new(bad_url), Err(Error::Config(_))));

        let zero_timeout = NodeConfig {
            timeout_seconds: 0,
            ..NodeConfig::default()
        };
        assert!(matches!(NodeClient::new(zero_timeout), Err(Error::Config(_))));

        let zero_page = NodeConfig {
            page_size: 0,
            ..NodeConfig::default()
        };
        assert!(matches!(NodeClient::new(zero_page), Err(Error::Config(_))));
    }
}
