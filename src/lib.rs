// src/lib.rs
// =============================================================================
// vcrawler: crawl one website and collect a record for every page.
//
// Pipeline (one direction only):
//   fetch (URL -> HTML) -> extract (HTML -> PageRecord) -> crawl (result map)
//   -> report (CSV)
//
// The binary in main.rs wires these together; everything here is usable on
// its own.
// =============================================================================

pub mod crawl;     // src/crawl/ - the concurrent crawl engine
pub mod extract;   // src/extract/ - HTML -> PageRecord
pub mod fetch;     // src/fetch/ - downloading pages
pub mod normalize; // src/normalize.rs - URL dedup keys
pub mod report;    // src/report.rs - CSV output
