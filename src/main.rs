// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse and validate command-line arguments
// 2. Set up logging
// 3. Crawl the website (Ctrl-C stops early but keeps what we have)
// 4. Write the CSV report (and optionally print JSON)
// 5. Exit with proper code (0 = done, 1 = bad arguments, 2 = error)
// =============================================================================

// Module declarations - the crawler itself lives in the library (src/lib.rs)
mod cli; // src/cli.rs - command-line parsing

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, CrawlSettings};
use vcrawler::crawl::{CrawlOutcome, Crawler};
use vcrawler::fetch::{FetchConfig, HttpFetcher};
use vcrawler::report;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = crawl finished (or advisory usage message printed)
//   Ok(1) = invalid arguments
//   Err   = unexpected error (report couldn't be written, etc.)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let settings = match cli.crawl_settings() {
        Ok(settings) => settings,
        Err(e) => {
            let code = e.exit_code();
            if code == 0 {
                println!("{}", e);
            } else {
                eprintln!("Error: {}", e);
            }
            return Ok(code);
        }
    };

    let outcome = handle_crawl(&settings).await?;

    report::write_report(&outcome.pages, &cli.output)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome.pages)?;
        println!("{}", json);
    }

    print_summary(&outcome);
    println!("📝 Report written to {}", cli.output.display());

    Ok(0)
}

// Sends log output to stderr so stdout stays clean for --json
fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set up logging")?;

    Ok(())
}

async fn handle_crawl(settings: &CrawlSettings) -> Result<CrawlOutcome> {
    println!(
        "🔍 Crawling {} (max concurrency: {}, max pages: {})",
        settings.seed, settings.crawl.max_concurrency, settings.crawl.max_pages
    );

    let fetcher = HttpFetcher::new(FetchConfig {
        timeout: settings.timeout,
        ..FetchConfig::default()
    })
    .context("failed to build HTTP client")?;

    let crawler = Crawler::new(settings.seed.clone(), fetcher, settings.crawl);

    // Ctrl-C aborts in-flight requests; the pages gathered so far are
    // still returned and written to the report
    let abort = crawler.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping crawl");
            abort.cancel();
        }
    });

    let outcome = crawler.crawl().await;
    ctrl_c.abort();

    Ok(outcome)
}

fn print_summary(outcome: &CrawlOutcome) {
    println!();
    println!("📊 Summary:");
    println!("   📄 Pages: {}", outcome.pages.len());
    println!("   ❌ Failed fetches: {}", outcome.failed_fetches);
    println!("   ⏹️  Aborted fetches: {}", outcome.aborted_fetches);
}
