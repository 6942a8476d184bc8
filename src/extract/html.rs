// src/extract/html.rs
// =============================================================================
// This module pulls structured data out of HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever, which never rejects input; broken markup is
//   repaired the same way a browser would
//
// What we extract:
// - h1:              text of the first <h1>
// - first_paragraph: text of the first <p> inside <main>, else the first <p>
// - outgoing_links:  every <a href>, resolved to an absolute URL
// - image_urls:      every <img src>, resolved the same way
//
// Relative links are resolved against the page's own URL, the way a
// browser would, not against the crawl's seed URL.
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::PageRecord;

// Extracts a full PageRecord from one page
//
// Parameters:
//   html: the page body (may be empty)
//   page_url: the URL the page was fetched from
pub fn extract_page(html: &str, page_url: &Url) -> PageRecord {
    let document = Html::parse_document(html);

    PageRecord {
        url: page_url.to_string(),
        h1: h1_text(&document),
        first_paragraph: first_paragraph_text(&document),
        outgoing_links: resolve_attr(&document, "a[href]", "href", page_url),
        image_urls: resolve_attr(&document, "img[src]", "src", page_url),
    }
}

fn h1_text(document: &Html) -> String {
    first_text(document, "h1").unwrap_or_default()
}

fn first_paragraph_text(document: &Html) -> String {
    // A <main> with no <p> inside falls back to the first <p> anywhere
    first_text(document, "main p")
        .or_else(|| first_text(document, "p"))
        .unwrap_or_default()
}

// Text content of the first element matching `css`, trimmed
fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = selector(css)?;
    document.select(&selector).next().map(element_text)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

// Collects `attr` from every element matching `css`, resolved against `base`
//
// Empty attributes and values the url crate can't resolve are skipped.
fn resolve_attr(document: &Html, css: &str, attr: &str, base: &Url) -> Vec<String> {
    let Some(selector) = selector(css) else {
        return Vec::new();
    };

    let mut urls = Vec::new();
    for element in document.select(&selector) {
        let Some(value) = element.value().attr(attr) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match base.join(value) {
            Ok(url) => urls.push(url.to_string()),
            Err(e) => debug!(base = %base, value, error = %e, "skipping unresolvable {}", attr),
        }
    }

    urls
}

// Our selectors are constants, but a parse failure still only empties the
// field instead of panicking
fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            debug!(css, error = %e, "invalid CSS selector");
            None
        }
    }
}
