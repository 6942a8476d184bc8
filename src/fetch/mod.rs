// src/fetch/mod.rs
// =============================================================================
// This module downloads pages.
//
// Submodules:
// - http: The real fetcher, built on reqwest
//
// The crawl engine doesn't talk to reqwest directly. It only knows the
// PageFetcher trait below, so tests can hand it an in-memory website instead
// of the network.
//
// Fetch policy:
// - HTTP status >= 399     -> Ok("")  (page exists but is empty)
// - Content-Type not HTML  -> Ok("")
// - Network/transport fail -> Err(FetchError::Timeout | Connect | Network)
// - Abort token raised     -> Err(FetchError::Aborted)
// =============================================================================

mod http;

pub use http::{FetchConfig, HttpFetcher};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Errors that can end a fetch without a body
#[derive(Debug, Error)]
pub enum FetchError {
    /// The abort token fired before or during the request
    #[error("fetch aborted")]
    Aborted,
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    // Sorts a reqwest error into one of our variants
    pub fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            FetchError::Timeout { url }
        } else if error.is_connect() {
            FetchError::Connect { url, source: error }
        } else {
            FetchError::Network { url, source: error }
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }
}

/// Anything that can turn a URL into page HTML.
///
/// `cancel` is the crawl's abort token; implementations must give up with
/// `FetchError::Aborted` as soon as it fires.
pub trait PageFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a Url,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<String, FetchError>>;
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is BoxFuture?
//    - An async fn returns a future whose exact type has no name
//    - Traits need a nameable return type, so we box the future:
//      Pin<Box<dyn Future<Output = T> + Send + 'a>>
//    - The 'a lifetime says the future may borrow self, url and cancel
//
// 2. Why #[source] on the reqwest error?
//    - thiserror wires it into std::error::Error::source()
//    - Loggers and anyhow can then print the whole error chain
// -----------------------------------------------------------------------------
