// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Usage:
//   vcrawler <seedURL> [maxConcurrency] [maxPages] [--output FILE] [--json]
//
// clap parses the raw arguments, but we keep the positionals optional and
// validate them ourselves, because some mistakes (no URL, too many
// arguments) should print advice and exit 0 instead of clap's hard error.
//
// Rust concepts:
// - Derive macros: clap generates the parser from the struct
// - thiserror: one enum variant per way the arguments can be wrong
// =============================================================================

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use vcrawler::crawl::CrawlConfig;

const DEFAULT_MAX_CONCURRENCY: usize = 5;
const DEFAULT_MAX_PAGES: usize = 10;

#[derive(Parser, Debug)]
#[command(
    name = "vcrawler",
    version = "0.1.0",
    about = "Crawl one website and write a CSV report of its pages",
    long_about = "vcrawler starts at a seed URL, follows every link that stays on the same hostname, \
                  and records each page's title, first paragraph, links and images. \
                  The crawl stops after maxPages pages and never runs more than maxConcurrency \
                  requests at once."
)]
pub struct Cli {
    /// Website URL to start from (e.g., https://example.com)
    pub url: Option<String>,

    /// Maximum number of requests in flight at once (default: 5)
    #[arg(allow_negative_numbers = true)]
    pub max_concurrency: Option<String>,

    /// Maximum number of pages to crawl (default: 10)
    #[arg(allow_negative_numbers = true)]
    pub max_pages: Option<String>,

    /// Anything after maxPages; only used to report "too many arguments"
    #[arg(hide = true)]
    pub extra: Vec<String>,

    /// Where to write the CSV report
    #[arg(short, long, default_value = "report.csv")]
    pub output: PathBuf,

    /// Also print the crawled pages as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Validated crawl parameters
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub seed: Url,
    pub crawl: CrawlConfig,
    pub timeout: Duration,
}

/// Ways the command line can be wrong
#[derive(Debug, Error, PartialEq)]
pub enum ArgumentError {
    #[error("Please provide the URL to crawl")]
    MissingUrl,
    #[error("Too many arguments provided. Usage: vcrawler <seedURL> [maxConcurrency] [maxPages]")]
    TooManyArguments,
    #[error("Invalid {name} '{value}': must be a finite number greater than or equal to 1")]
    InvalidNumber { name: &'static str, value: String },
    #[error("Invalid URL '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },
}

impl ArgumentError {
    /// Missing/extra arguments are advisory (exit 0); bad values exit 1
    pub fn exit_code(&self) -> i32 {
        match self {
            ArgumentError::MissingUrl | ArgumentError::TooManyArguments => 0,
            ArgumentError::InvalidNumber { .. } | ArgumentError::InvalidUrl { .. } => 1,
        }
    }
}

impl Cli {
    /// Checks the positionals and builds the crawl parameters
    pub fn crawl_settings(&self) -> Result<CrawlSettings, ArgumentError> {
        let Some(raw_url) = self.url.as_deref() else {
            return Err(ArgumentError::MissingUrl);
        };
        if !self.extra.is_empty() {
            return Err(ArgumentError::TooManyArguments);
        }

        let max_concurrency = parse_count(
            "maxConcurrency",
            self.max_concurrency.as_deref(),
            DEFAULT_MAX_CONCURRENCY,
        )?;
        let max_pages = parse_count("maxPages", self.max_pages.as_deref(), DEFAULT_MAX_PAGES)?;

        Ok(CrawlSettings {
            seed: parse_seed(raw_url)?,
            crawl: CrawlConfig {
                max_concurrency,
                max_pages,
            },
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

// Parses a positive count like "5" or "5.0"
//
// NaN, infinity, zero, negatives and anything that floors below 1 are
// rejected. Fractions are floored ("2.7" -> 2).
fn parse_count(name: &'static str, raw: Option<&str>, default: usize) -> Result<usize, ArgumentError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    let invalid = || ArgumentError::InvalidNumber {
        name,
        value: raw.to_string(),
    };

    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value.floor() < 1.0 {
        return Err(invalid());
    }

    Ok(value.floor() as usize)
}

// The seed must be absolute and have a hostname (the crawl boundary)
fn parse_seed(raw: &str) -> Result<Url, ArgumentError> {
    let url = Url::parse(raw).map_err(|e| ArgumentError::InvalidUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none() {
        return Err(ArgumentError::InvalidUrl {
            value: raw.to_string(),
            reason: "URL has no host".to_string(),
        });
    }

    Ok(url)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why are the numbers Option<String> and not Option<usize>?
//    - clap would reject "abc" or "-1" itself and exit with its own code
//    - We want our own message and exit code 1 for those, so we take the
//      raw text and validate it in parse_count()
//
// 2. What does allow_negative_numbers do?
//    - Without it, clap reads "-1" as an unknown flag
//    - With it, "-1" arrives as a value and parse_count() rejects it
//
// 3. What is `let ... else`?
//    - Like if let, but the else branch must leave the function (return)
//    - Keeps the happy path unindented
// -----------------------------------------------------------------------------
