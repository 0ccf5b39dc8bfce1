use anyhow::{Result, anyhow};
use std::time::{Duration, Instant};

/// Performs one probe against a target.
///
/// Implementations report success as latency in milliseconds plus an optional
/// status code; any failure (refused connection, bad status, DNS) is an error.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, target: &str) -> Result<(u64, Option<u16>)>;
}

/// HTTP/HTTPS checker
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("datacat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, target: &str) -> Result<(u64, Option<u16>)> {
        let start = Instant::now();

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let latency = start.elapsed().as_millis() as u64;
        let status_code = response.status().as_u16();

        // Consider 2xx and 3xx as success
        if response.status().is_success() || response.status().is_redirection() {
            Ok((latency, Some(status_code)))
        } else {
            Err(anyhow!("HTTP check failed with status code: {}", status_code))
        }
    }
}
