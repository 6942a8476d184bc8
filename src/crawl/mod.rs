// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Concurrent crawling starting from a seed URL
// - Same-hostname restriction (doesn't crawl external sites)
// - Page budget: stops after max_pages distinct pages
// - Concurrency limit: at most max_concurrency fetches at once
// - Clean shutdown: waits for every spawned task before returning
//
// Submodules:
// - admission: the visited set, budget and stop signal (who may visit what)
// - engine: spawning, fetching, collecting results
// =============================================================================

mod admission;
mod engine;

pub use admission::{Admission, AdmissionControl, Refusal};
pub use engine::{CrawlConfig, CrawlOutcome, Crawler, Pages};
