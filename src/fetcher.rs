use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client, Url};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::config::AnalyzerConfig;
use crate::error::FetchError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A page retrieved by the fetcher, scoped to one request's processing.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub status: u16,
    pub html: String,
}

/// Polite HTTP fetcher for recipe pages.
///
/// Applies a fixed delay between consecutive requests (scoped to this
/// instance), a configured timeout, and a bounded internal retry on
/// retryable statuses and connection errors. No AI involved.
pub struct ContentFetcher {
    client: Client,
    delay: Duration,
    retry_attempts: u32,
    allow_local: bool,
    last_request: Mutex<Option<Instant>>,
}

impl ContentFetcher {
    pub fn new(timeout: Duration, delay: Duration, retry_attempts: u32) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        ContentFetcher {
            client,
            delay,
            retry_attempts,
            allow_local: false,
            last_request: Mutex::new(None),
        }
    }

    /// Permit localhost targets, for fetching from local fixture servers.
    pub fn allow_local(mut self, allow: bool) -> Self {
        self.allow_local = allow;
        self
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            Duration::from_secs(config.fetch_timeout_secs),
            Duration::from_millis(config.fetch_delay_ms),
            config.fetch_retry_attempts,
        )
        .allow_local(config.allow_local_urls)
    }

    /// Reject anything that is not an absolute HTTP(S) URL with a public host.
    fn validate(&self, url: &str) -> Result<Url, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl("missing host".to_string()))?;

        // Local targets are rejected to keep the fetcher from being used
        // as an internal-network probe.
        if !self.allow_local && matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0" | "[::1]") {
            warn!("rejected local URL: {}", url);
            return Err(FetchError::InvalidUrl(format!("local host: {}", host)));
        }

        Ok(parsed)
    }

    /// Wait out the politeness delay since the previous fetch. The lock is
    /// held across the sleep so concurrent fetches through one instance are
    /// spaced out rather than released in a burst.
    async fn politeness_delay(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let since = previous.elapsed();
            if since < self.delay {
                let wait = self.delay - since;
                debug!("politeness delay: sleeping {:?}", wait);
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn is_retryable_status(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let parsed = self.validate(url)?;
        self.politeness_delay().await;

        let total_attempts = self.retry_attempts + 1;
        let mut last_error = FetchError::Connection("no attempt made".to_string());

        for attempt in 1..=total_attempts {
            debug!("fetching {} (attempt {}/{})", url, attempt, total_attempts);

            match self.client.get(parsed.clone()).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        let html = response
                            .text()
                            .await
                            .map_err(|e| FetchError::Connection(e.to_string()))?;
                        info!("fetched {} ({} bytes)", url, html.len());
                        return Ok(FetchedDocument {
                            url: url.to_string(),
                            status,
                            html,
                        });
                    }

                    if !Self::is_retryable_status(status) {
                        return Err(FetchError::Status(status));
                    }
                    warn!("retryable status {} fetching {}", status, url);
                    last_error = FetchError::Status(status);
                }
                Err(e) if e.is_timeout() => {
                    // A timeout already waited the full configured window;
                    // retrying would double the caller-visible latency.
                    return Err(FetchError::Timeout);
                }
                Err(e) => {
                    warn!("connection error fetching {}: {}", url, e);
                    last_error = FetchError::Connection(e.to_string());
                }
            }

            if attempt < total_attempts {
                // Linear backoff between fetch attempts
                sleep(Duration::from_millis(500 * attempt as u64)).await;
            }
        }

        Err(last_error)
    }
}
