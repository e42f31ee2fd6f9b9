//! HTTP client for product page retrieval with rate limiting and error handling
//!
//! `DocumentSource` is the seam the category fetcher depends on; `HttpClient`
//! is the production implementation, tests substitute stubs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT},
};
use std::num::NonZeroU32;
use std::time::Duration;
use url::Url;

use crate::infrastructure::config::FetcherConfig;
use crate::infrastructure::fetch_error::FetchFailure;

/// Retrieves the raw document behind a URL
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_document(&self, url: &Url) -> Result<String, FetchFailure>;
}

/// HTTP client configuration for page retrieval
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&FetcherConfig::default())
    }
}

impl From<&FetcherConfig> for HttpClientConfig {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout_seconds: config.timeout_seconds,
            max_requests_per_second: config.max_requests_per_second,
        }
    }
}

/// HTTP client with a process-wide request ceiling
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        // Setup headers
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        // Build reqwest client
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        // Setup rate limiter
        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Fetch URL and return text content
    pub async fn get_text(&self, url: &Url) -> Result<String, FetchFailure> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        tracing::debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchFailure::from_reqwest(url.as_str(), &e))?;

        if !response.status().is_success() {
            return Err(FetchFailure::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchFailure::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchFailure::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        tracing::debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }
}

#[async_trait]
impl DocumentSource for HttpClient {
    async fn fetch_document(&self, url: &Url) -> Result<String, FetchFailure> {
        self.get_text(url).await
    }
}
