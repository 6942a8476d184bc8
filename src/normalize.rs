// src/normalize.rs
// =============================================================================
// This module turns a URL into the key we use to decide "have we been here?"
//
// Two links often point at the same page while looking different:
//   https://www.example.com/blog
//   http://WWW.EXAMPLE.COM/blog/
// Both should count as one page, so we compare a normalized key instead:
//   www.example.com/blog
//
// The key keeps only host (with port, if non-default) and path, drops the
// scheme, query, fragment and credentials, strips one trailing slash from a
// non-root path, and lowercases everything.
// =============================================================================

use serde::Serialize;
use std::fmt;
use url::Url;

/// Canonical identity of a page, used as the dedup key and as the result map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Normalizes an absolute URL into its NormalizedKey
//
// Examples:
//   https://www.x.com/blog   -> www.x.com/blog
//   https://www.x.com/blog/  -> www.x.com/blog
//   http://localhost:8080/a/ -> localhost:8080/a
//   https://www.x.com/       -> www.x.com/
pub fn normalize_url(url: &Url) -> NormalizedKey {
    let mut key = String::new();

    if let Some(host) = url.host_str() {
        key.push_str(host);
    }
    // Url::port() is None for the scheme's default port, so
    // http://x.com:80/ and http://x.com/ share a key
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }

    let path = url.path();
    match path.strip_suffix('/') {
        Some(trimmed) if path != "/" => key.push_str(trimmed),
        _ => key.push_str(path),
    }

    NormalizedKey(key.to_lowercase())
}
