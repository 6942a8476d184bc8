// src/crawl/engine.rs
// =============================================================================
// This module is the crawl engine: it walks a website's link graph with many
// pages in flight at once.
//
// How it works:
// 1. Spawn a visit task for the seed URL into a JoinSet
// 2. Each visit task:
//      - asks AdmissionControl for a claim on its URL (or gives up)
//      - waits for a slot in the concurrency limiter (a Semaphore)
//      - fetches the page, releases the slot, extracts the PageRecord
//      - hands the record back to the engine
// 3. The engine loop stores each record and spawns one new visit task per
//    outgoing link
// 4. When the JoinSet is empty, every task ever spawned (children,
//    grandchildren, ...) has finished, and the crawl is done
//
// Only the engine loop touches the result map, so it needs no lock. The only
// shared mutable state is the visited set inside AdmissionControl.
//
// Stopping:
// - stop token:  raised when the page budget is used up (or on abort).
//                Admission refuses everything, no new fetch starts.
// - abort token: raised by the operator (Ctrl-C). In-flight fetches end
//                right away with FetchError::Aborted. stop is a child of
//                abort, so aborting also stops admission.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::admission::{Admission, AdmissionControl};
use crate::extract::{extract_page, PageRecord};
use crate::fetch::{FetchError, PageFetcher};
use crate::normalize::NormalizedKey;

/// Crawl results keyed by normalized URL (sorted, so output is stable)
pub type Pages = BTreeMap<NormalizedKey, PageRecord>;

/// Crawl limits
#[derive(Debug, Clone, Copy)]
pub struct CrawlConfig {
    /// How many fetches may be in flight at once
    pub max_concurrency: usize,
    /// How many distinct pages may be recorded
    pub max_pages: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            max_pages: 10,
        }
    }
}

/// What a finished crawl hands back
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub pages: Pages,
    /// Pages recorded empty because of a network error
    pub failed_fetches: usize,
    /// Pages recorded empty because the crawl was aborted mid-fetch
    pub aborted_fetches: usize,
}

// How one visit task ended
enum Visit {
    Refused,
    Recorded {
        key: NormalizedKey,
        record: PageRecord,
        fetch: FetchStatus,
    },
}

enum FetchStatus {
    Ok,
    Failed,
    Aborted,
}

// State shared (read-only, apart from the visited set) by all visit tasks
struct Shared<F> {
    fetcher: F,
    admission: AdmissionControl,
    limiter: Semaphore,
    abort: CancellationToken,
}

/// Crawls one website, staying on the seed URL's hostname
pub struct Crawler<F> {
    seed: Url,
    shared: Arc<Shared<F>>,
}

impl<F> Crawler<F>
where
    F: PageFetcher + 'static,
{
    pub fn new(seed: Url, fetcher: F, config: CrawlConfig) -> Self {
        let abort = CancellationToken::new();
        let stop = abort.child_token();

        let shared = Shared {
            fetcher,
            admission: AdmissionControl::new(&seed, config.max_pages, stop),
            // Semaphore::new panics above MAX_PERMITS
            limiter: Semaphore::new(config.max_concurrency.clamp(1, Semaphore::MAX_PERMITS)),
            abort,
        };

        Self {
            seed,
            shared: Arc::new(shared),
        }
    }

    /// Token that aborts the crawl when cancelled (e.g. on Ctrl-C)
    pub fn cancel_handle(&self) -> CancellationToken {
        self.shared.abort.clone()
    }

    /// Runs the crawl until no work is left, then returns every recorded page
    pub async fn crawl(self) -> CrawlOutcome {
        let mut outcome = CrawlOutcome::default();
        let mut tasks = JoinSet::new();

        tasks.spawn(visit(self.shared.clone(), self.seed.clone()));

        // join_next() returns None only once every spawned task has finished,
        // including the ones we spawn inside this loop
        while let Some(joined) = tasks.join_next().await {
            let finished = match joined {
                Ok(finished) => finished,
                Err(e) => {
                    warn!(error = %e, "visit task failed");
                    continue;
                }
            };

            let Visit::Recorded { key, record, fetch } = finished else {
                continue;
            };

            match fetch {
                FetchStatus::Ok => {}
                FetchStatus::Failed => outcome.failed_fetches += 1,
                FetchStatus::Aborted => outcome.aborted_fetches += 1,
            }

            // Once stopped, admission would refuse every child anyway
            if !self.shared.admission.stop_signal().is_cancelled() {
                for link in &record.outgoing_links {
                    match Url::parse(link) {
                        Ok(next) => {
                            tasks.spawn(visit(self.shared.clone(), next));
                        }
                        Err(e) => debug!(link = %link, error = %e, "skipping unparseable link"),
                    }
                }
            }

            outcome.pages.insert(key, record);
        }

        outcome
    }
}

// One unit of work: admit, fetch under the limiter, extract
async fn visit<F: PageFetcher>(shared: Arc<Shared<F>>, url: Url) -> Visit {
    let key = match shared.admission.admit(&url) {
        Admission::Claimed { key, last } => {
            if last {
                info!(max_pages = shared.admission.max_pages(), "reached maximum number of pages to crawl");
            }
            key
        }
        Admission::Refused(reason) => {
            debug!(url = %url, ?reason, "not visiting");
            return Visit::Refused;
        }
    };

    info!(url = %url, "crawling");

    let result = match shared.limiter.acquire().await {
        // The permit is dropped at the end of this arm, so the slot is only
        // held for the network call
        Ok(_permit) => shared.fetcher.fetch(&url, &shared.abort).await,
        Err(_) => Err(FetchError::Aborted),
    };

    let (html, fetch) = match result {
        Ok(html) => (html, FetchStatus::Ok),
        Err(FetchError::Aborted) => (String::new(), FetchStatus::Aborted),
        Err(e) => {
            warn!(url = %url, error = %e, "failed to fetch page");
            (String::new(), FetchStatus::Failed)
        }
    };

    Visit::Recorded {
        key,
        record: extract_page(&html, &url),
        fetch,
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is a JoinSet?
//    - A collection of spawned tokio tasks
//    - join_next().await gives back results as tasks finish (any order)
//    - We can keep spawning into it while draining it, which is how the
//      crawl grows from one page to the whole site
//
// 2. What is a Semaphore?
//    - A counter of "permits"
//    - acquire().await waits until a permit is free, and the returned guard
//      gives it back when dropped
//    - Semaphore::new(5) = at most 5 fetches running at the same time
//
// 3. Why Arc<Shared<F>>?
//    - Every spawned task needs the fetcher, the admission control, etc.
//    - Tasks must be 'static, so they can't borrow from the Crawler
//    - Arc (atomic reference counting) lets them all share ownership
//
// 4. Why are failed pages still recorded?
//    - The page was claimed, so it counts toward the budget
//    - Recording it empty keeps "pages == budget" true when the budget stops
//      the crawl, and one bad page never takes the crawl down
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{BoxFuture, FutureExt};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    // An in-memory website: URL -> HTML. Unknown URLs fail like a dead host.
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, String>,
        calls: Mutex<HashMap<String, usize>>,
        delay: Option<Duration>,
    }

    impl FakeSite {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.trim_end_matches('/').to_string(), html.to_string());
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> HashMap<String, usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PageFetcher for Arc<FakeSite> {
        fn fetch<'a>(
            &'a self,
            url: &'a Url,
            cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<String, FetchError>> {
            async move {
                *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

                if let Some(delay) = self.delay {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(FetchError::Aborted),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                if cancel.is_cancelled() {
                    return Err(FetchError::Aborted);
                }

                // Serve /page/ and /page from the same entry
                let path = url.as_str().trim_end_matches('/');
                self.pages.get(path).cloned().ok_or_else(|| FetchError::Timeout {
                    url: url.to_string(),
                })
            }
            .boxed()
        }
    }

    fn links(targets: &[&str]) -> String {
        let anchors: String = targets
            .iter()
            .map(|t| format!(r#"<a href="{}">link</a>"#, t))
            .collect();
        format!("<html><body><h1>Page</h1>{}</body></html>", anchors)
    }

    // A ten page site where every page links to the next two (wrapping),
    // back to the home page, and off-site
    fn ring_site() -> FakeSite {
        build_ring(false)
    }

    // Same graph, but the second link carries a trailing slash, so most
    // pages are reachable under two spellings
    fn aliased_ring_site() -> FakeSite {
        build_ring(true)
    }

    fn build_ring(aliased: bool) -> FakeSite {
        let slash = if aliased { "/" } else { "" };
        let mut site = FakeSite::default();
        for i in 0..10 {
            let html = links(&[
                format!("/p{}", (i + 1) % 10).as_str(),
                format!("/p{}{}", (i + 2) % 10, slash).as_str(),
                "https://example.com/p0",
                "https://elsewhere.com/p1",
            ]);
            site = site.page(&format!("https://example.com/p{}", i), &html);
        }
        site
    }

    async fn run(site: Arc<FakeSite>, seed: &str, max_concurrency: usize, max_pages: usize) -> CrawlOutcome {
        let config = CrawlConfig {
            max_concurrency,
            max_pages,
        };
        Crawler::new(Url::parse(seed).unwrap(), site, config).crawl().await
    }

    #[tokio::test]
    async fn test_single_page() {
        let site = Arc::new(FakeSite::default().page(
            "https://example.com/",
            "<h1>Home</h1><main><p>Welcome.</p></main><img src='/logo.png'>",
        ));
        let outcome = run(site, "https://example.com/", 2, 10).await;

        assert_eq!(outcome.pages.len(), 1);
        let record = outcome.pages.values().next().unwrap();
        assert_eq!(record.h1, "Home");
        assert_eq!(record.first_paragraph, "Welcome.");
        assert_eq!(record.image_urls, vec!["https://example.com/logo.png"]);
    }

    #[tokio::test]
    async fn test_crawls_whole_site_within_budget() {
        let site = Arc::new(ring_site());
        let outcome = run(site.clone(), "https://example.com/p0", 4, 50).await;

        assert_eq!(outcome.pages.len(), 10);
        assert_eq!(outcome.failed_fetches, 0);
    }

    #[tokio::test]
    async fn test_budget_caps_pages_exactly() {
        for max_pages in [1, 3, 7] {
            for concurrency in [1, 2, 8] {
                let site = Arc::new(ring_site().with_delay(Duration::from_millis(2)));
                let outcome = run(site.clone(), "https://example.com/p0", concurrency, max_pages).await;

                assert_eq!(outcome.pages.len(), max_pages);
                let fetched: usize = site.calls().values().sum();
                assert_eq!(fetched, max_pages, "a fetch started after the budget was used up");
                // Reaching the budget must not cut claimed pages short
                assert_eq!(outcome.aborted_fetches, 0);
                assert!(outcome.pages.values().all(|p| p.h1 == "Page"));
            }
        }
    }

    #[tokio::test]
    async fn test_each_page_fetched_once() {
        let site = Arc::new(aliased_ring_site().with_delay(Duration::from_millis(1)));
        let outcome = run(site.clone(), "https://example.com/p0", 8, 100).await;

        assert_eq!(outcome.pages.len(), 10);
        assert_eq!(outcome.failed_fetches, 0);
        assert!(outcome.pages.keys().all(|k| !k.as_str().ends_with('/')));

        // /p3 and /p3/ are the same page
        let mut per_page: HashMap<String, usize> = HashMap::new();
        for (url, count) in site.calls() {
            *per_page.entry(url.trim_end_matches('/').to_string()).or_insert(0) += count;
        }
        assert_eq!(per_page.len(), 10);
        for (url, count) in per_page {
            assert_eq!(count, 1, "{} fetched {} times", url, count);
        }
    }

    #[tokio::test]
    async fn test_stays_on_seed_host() {
        let site = Arc::new(
            ring_site()
                .page("https://elsewhere.com/p1", &links(&["https://elsewhere.com/p2"]))
                .page("https://elsewhere.com/p2", "<h1>Far</h1>"),
        );
        let outcome = run(site.clone(), "https://example.com/p0", 4, 100).await;

        assert!(outcome.pages.keys().all(|k| k.as_str().starts_with("example.com/")));
        assert!(outcome
            .pages
            .values()
            .all(|p| Url::parse(&p.url).unwrap().host_str() == Some("example.com")));
        assert!(!site.calls().keys().any(|u| u.contains("elsewhere.com")));
    }

    #[tokio::test]
    async fn test_same_result_at_any_concurrency() {
        let mut results = Vec::new();
        for concurrency in [1, 2, 8] {
            let site = Arc::new(ring_site().with_delay(Duration::from_millis(1)));
            results.push(run(site, "https://example.com/p0", concurrency, 100).await.pages);
        }

        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_recorded_empty() {
        // /missing isn't in the fake site, so fetching it errors
        let site = Arc::new(
            FakeSite::default()
                .page("https://example.com/", &links(&["/missing", "/ok"]))
                .page("https://example.com/ok", "<h1>Fine</h1>"),
        );
        let outcome = run(site, "https://example.com/", 2, 10).await;

        assert_eq!(outcome.pages.len(), 3);
        assert_eq!(outcome.failed_fetches, 1);

        let missing = outcome
            .pages
            .values()
            .find(|p| p.url == "https://example.com/missing")
            .unwrap();
        assert_eq!(missing, &PageRecord::empty("https://example.com/missing"));
    }

    #[tokio::test]
    async fn test_aborted_before_start_crawls_nothing() {
        let site = Arc::new(ring_site());
        let crawler = Crawler::new(
            Url::parse("https://example.com/p0").unwrap(),
            site.clone(),
            CrawlConfig::default(),
        );
        crawler.cancel_handle().cancel();
        let outcome = crawler.crawl().await;

        assert!(outcome.pages.is_empty());
        assert!(site.calls().is_empty());
    }

    #[tokio::test]
    async fn test_abort_mid_crawl_ends_in_flight_fetches() {
        let site = Arc::new(ring_site().with_delay(Duration::from_secs(30)));
        let crawler = Crawler::new(
            Url::parse("https://example.com/p0").unwrap(),
            site.clone(),
            CrawlConfig::default(),
        );
        let abort = crawler.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            abort.cancel();
        });

        let outcome = tokio::time::timeout(Duration::from_secs(5), crawler.crawl())
            .await
            .expect("crawl did not stop after abort");

        // The seed was claimed, so it is still recorded (empty)
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.aborted_fetches, 1);
        assert_eq!(outcome.failed_fetches, 0);
    }

    #[tokio::test]
    async fn test_seed_off_site_links_only() {
        let site = Arc::new(FakeSite::default().page(
            "https://example.com/",
            &links(&["https://other.com/", "mailto:hi@example.com"]),
        ));
        let outcome = run(site.clone(), "https://example.com/", 2, 10).await;

        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(site.calls().len(), 1);
    }

    // Counts how many fetches are running at once
    #[derive(Default)]
    struct CountingSite {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl PageFetcher for Arc<CountingSite> {
        fn fetch<'a>(
            &'a self,
            url: &'a Url,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<String, FetchError>> {
            async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                // The home page fans out to 30 leaf pages
                if url.path() == "/" {
                    let targets: Vec<String> = (0..30).map(|i| format!("/leaf{}", i)).collect();
                    let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
                    Ok(links(&targets))
                } else {
                    Ok("<h1>Leaf</h1>".to_string())
                }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_fetches_never_exceed_concurrency_limit() {
        for max_concurrency in [1, 3] {
            let site = Arc::new(CountingSite::default());
            let config = CrawlConfig {
                max_concurrency,
                max_pages: 31,
            };
            let outcome = Crawler::new(Url::parse("https://example.com/").unwrap(), site.clone(), config)
                .crawl()
                .await;

            assert_eq!(outcome.pages.len(), 31);
            let peak = site.peak.load(Ordering::SeqCst);
            assert!(peak <= max_concurrency, "{} fetches ran at once, limit {}", peak, max_concurrency);
            assert!(peak >= 1);
        }
    }

    #[tokio::test]
    async fn test_huge_concurrency_is_clamped() {
        // "3e18" on the command line floors and casts to a usize far above
        // the semaphore's permit limit
        for max_concurrency in [3e18_f64 as usize, usize::MAX] {
            let config = CrawlConfig {
                max_concurrency,
                max_pages: 3,
            };
            let site = Arc::new(ring_site());
            let outcome = Crawler::new(Url::parse("https://example.com/p0").unwrap(), site, config)
                .crawl()
                .await;
            assert_eq!(outcome.pages.len(), 3);
        }
    }
}
