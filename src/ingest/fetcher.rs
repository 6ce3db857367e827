//! Document fetching capability.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::IngestConfig;
use crate::error::{FetchError, IngestError};

/// Retrieves raw markup for a source URI.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, uri: &Url) -> Result<String, FetchError>;
}

/// HTTP fetcher with a per-request bound and an identifying user agent.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &IngestConfig) -> Result<Self, IngestError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| IngestError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            timeout: config.fetch_timeout,
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, uri: &Url) -> Result<String, FetchError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    uri: uri.to_string(),
                    timeout: self.timeout,
                }
            } else {
                FetchError::Network {
                    uri: uri.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let resp = self.client.get(uri.clone()).send().await.map_err(map_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_default_config() {
        assert!(HttpFetcher::new(&IngestConfig::default()).is_ok());
    }

    #[test]
    fn bad_user_agent_is_a_construction_error() {
        let config = IngestConfig {
            user_agent: "contact-blast\nX-Injected: 1".into(),
            ..IngestConfig::default()
        };
        let err = HttpFetcher::new(&config).err().unwrap();
        assert!(matches!(err, IngestError::HttpClient(_)));
        assert!(err.to_string().starts_with("Failed to build HTTP client"));
    }
}
