// src/extract/mod.rs
// =============================================================================
// This module turns a page's HTML into a PageRecord.
//
// Submodules:
// - html: CSS-selector based extraction with the `scraper` crate
//
// Extraction never fails. A broken document or a bad href simply leaves a
// field empty or drops one link, so one malformed page can't stop the crawl.
// =============================================================================

mod html;

pub use html::extract_page;

use serde::Serialize;

/// Everything we keep about one crawled page
///
/// `url` is the page URL as first encountered (not normalized).
/// Link and image lists are absolute, in document order, and may contain
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub h1: String,
    pub first_paragraph: String,
    pub outgoing_links: Vec<String>,
    pub image_urls: Vec<String>,
}

impl PageRecord {
    /// Record for a page whose HTML we couldn't get
    pub fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }
}
