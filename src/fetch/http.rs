// src/fetch/http.rs
// =============================================================================
// The real page fetcher: one GET request per page with reqwest.
//
// Every request:
// - carries the "VCrawler/1.0" User-Agent
// - races against the crawl's abort token (tokio::select!)
// - has a per-request timeout
//
// Rust concepts:
// - tokio::select!: run two futures, keep whichever finishes first
// - impl Trait for Type: plugging HttpFetcher into the PageFetcher trait
// =============================================================================

use futures::future::{BoxFuture, FutureExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::{FetchError, PageFetcher};

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Sent as the User-Agent header on every request
    pub user_agent: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "VCrawler/1.0".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Fetches pages over HTTP(S)
///
/// The client is built once and shared by every visit (connection pooling).
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client })
    }

    // Fetches a page, giving up as soon as `cancel` fires
    async fn fetch_page(&self, url: &Url, cancel: &CancellationToken) -> Result<String, FetchError> {
        // Don't even start a request once the crawl is being torn down
        if cancel.is_cancelled() {
            return Err(FetchError::Aborted);
        }

        tokio::select! {
            // `biased` makes select check the token first on every poll
            biased;
            _ = cancel.cancelled() => Err(FetchError::Aborted),
            result = self.get_html(url) => result,
        }
    }

    // Does the request and applies the status/content-type policy
    async fn get_html(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if status.as_u16() >= 399 {
            debug!(url = %url, status = status.as_u16(), "HTTP error status, treating page as empty");
            return Ok(String::new());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            debug!(url = %url, content_type = %content_type, "non-HTML response, treating page as empty");
            return Ok(String::new());
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a Url,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<String, FetchError>> {
        self.fetch_page(url, cancel).boxed()
    }
}

// Checks whether a Content-Type header names an HTML media type
fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}
