use std::future::Future;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::StatusCode;

use crate::config::CrawlerConfig;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("couldn't reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Retrieves one page.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>>;
}

/// Single GET over `reqwest`, bounded by the configured timeout, no retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> anyhow::Result<Self> {
        Self::with_timeout(config, config.timeout())
    }

    pub fn with_timeout(config: &CrawlerConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .deflate(true)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            timeout,
        })
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else if let Some(status) = e.status() {
            TransportError::Status {
                url: url.to_string(),
                status,
            }
        } else {
            TransportError::Network {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| self.classify(url, e))?;

        let page = resp.bytes().await.map_err(|e| self.classify(url, e))?;
        Ok(page.to_vec())
    }
}
