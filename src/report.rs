// src/report.rs
// =============================================================================
// Writes crawl results as a CSV report.
//
// Format:
//   page_url,h1,first_paragraph,outgoing_link_urls,image_urls
//   one row per page, list fields joined with ';'
//
// The csv crate quotes any field containing a comma, a quote or a newline,
// and doubles quotes inside it ("say ""hi""").
// =============================================================================

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::crawl::Pages;

const HEADER: [&str; 5] = [
    "page_url",
    "h1",
    "first_paragraph",
    "outgoing_link_urls",
    "image_urls",
];

const LIST_SEPARATOR: &str = ";";

/// Writes the report to `path`, replacing any existing file
pub fn write_report(pages: &Pages, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create report file {}", path.display()))?;
    write_records(pages, file)
        .with_context(|| format!("failed to write report file {}", path.display()))
}

/// Writes the report to any writer (rows follow the map's key order)
pub fn write_records<W: Write>(pages: &Pages, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);

    out.write_record(HEADER)?;
    for page in pages.values() {
        out.write_record([
            page.url.as_str(),
            page.h1.as_str(),
            page.first_paragraph.as_str(),
            page.outgoing_links.join(LIST_SEPARATOR).as_str(),
            page.image_urls.join(LIST_SEPARATOR).as_str(),
        ])?;
    }

    out.flush()?;
    Ok(())
}
