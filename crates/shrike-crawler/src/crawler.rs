use crate::fetcher::PageFetcher;
use crate::frontier::CrawlFrontier;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use futures::future;
use serde::Serialize;
use shrike_core::ConcurrencyLimiter;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Outcome of one page visit. Failures are recorded, never propagated.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    fn ok(url: String, content: String) -> Self {
        Self {
            url,
            fetched_at: Utc::now(),
            success: true,
            content: Some(content),
            error: None,
        }
    }

    fn failed(url: String, error: String) -> Self {
        Self {
            url,
            fetched_at: Utc::now(),
            success: false,
            content: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_pages: usize,
    pub max_concurrent: usize,
    pub same_domain_only: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_concurrent: 3,
            same_domain_only: true,
        }
    }
}

/// Point-in-time view of a crawl run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CrawlProgress {
    pub visited: usize,
    pub queued: usize,
    pub total: usize,
    pub max_pages: usize,
}

#[derive(Default)]
struct ProgressCounters {
    visited: AtomicUsize,
    queued: AtomicUsize,
    max_pages: AtomicUsize,
}

/// Cloneable handle reporting crawl progress from any task, at any time,
/// without touching frontier state.
#[derive(Clone)]
pub struct ProgressHandle {
    counters: Arc<ProgressCounters>,
}

impl ProgressHandle {
    pub fn snapshot(&self) -> CrawlProgress {
        let visited = self.counters.visited.load(Ordering::Relaxed);
        let queued = self.counters.queued.load(Ordering::Relaxed);
        CrawlProgress {
            visited,
            queued,
            total: visited + queued,
            max_pages: self.counters.max_pages.load(Ordering::Relaxed),
        }
    }
}

/// Bounded breadth-first traversal of one site under admission control.
///
/// URLs come off the frontier in batches of up to `max_concurrent`; each
/// fetch runs through the shared [`ConcurrencyLimiter`] (and whatever rate
/// limiter the fetcher itself applies). Discovered same-domain links feed
/// the frontier between batches, so only the coordinating loop ever
/// mutates traversal state.
pub struct DomainCrawler<F> {
    fetcher: Arc<F>,
    limiter: Arc<ConcurrencyLimiter>,
    config: CrawlConfig,
    counters: Arc<ProgressCounters>,
}

impl<F: PageFetcher> DomainCrawler<F> {
    pub fn new(fetcher: Arc<F>, config: CrawlConfig) -> Self {
        let limiter = Arc::new(ConcurrencyLimiter::new(config.max_concurrent));
        Self::with_limiter(fetcher, config, limiter)
    }

    /// Build a crawler sharing a process-wide concurrency gate with other
    /// callers instead of owning its own.
    pub fn with_limiter(
        fetcher: Arc<F>,
        config: CrawlConfig,
        limiter: Arc<ConcurrencyLimiter>,
    ) -> Self {
        let counters = Arc::new(ProgressCounters::default());
        counters
            .max_pages
            .store(config.max_pages, Ordering::Relaxed);
        Self {
            fetcher,
            limiter,
            config,
            counters,
        }
    }

    pub fn progress_handle(&self) -> ProgressHandle {
        ProgressHandle {
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn progress(&self) -> CrawlProgress {
        self.progress_handle().snapshot()
    }

    /// Crawl from `start_url` until the frontier empties or the page
    /// budget is spent. Per-page failures become failed [`PageResult`]s;
    /// only an unusable seed URL is an error.
    pub async fn crawl(&mut self, start_url: &str) -> Result<Vec<PageResult>> {
        let seed =
            Url::parse(start_url).map_err(|_| Error::InvalidUrl(start_url.to_string()))?;
        let scope = if self.config.same_domain_only {
            match host_key(&seed) {
                Some(key) => Some(key),
                None => return Err(Error::InvalidUrl(start_url.to_string())),
            }
        } else {
            None
        };

        let mut frontier = CrawlFrontier::new(seed.to_string(), self.config.max_pages);
        self.publish_progress(&frontier);

        let mut results = Vec::new();
        tracing::info!(
            seed = %seed,
            max_pages = self.config.max_pages,
            max_concurrent = self.config.max_concurrent,
            "starting crawl"
        );

        loop {
            let batch = frontier.next_batch(self.config.max_concurrent);
            if batch.is_empty() {
                break;
            }
            tracing::debug!(batch = batch.len(), "dispatching fetch batch");

            let fetches = batch.into_iter().map(|url| {
                let fetcher = Arc::clone(&self.fetcher);
                let limiter = Arc::clone(&self.limiter);
                async move {
                    let _slot = limiter.acquire().await;
                    let outcome = fetcher.fetch(&url).await;
                    (url, outcome)
                }
            });

            for (url, outcome) in future::join_all(fetches).await {
                match outcome {
                    Ok(page) => {
                        for link in resolve_links(&url, &page.discovered_links, scope.as_deref())
                        {
                            frontier.enqueue(link);
                        }
                        results.push(PageResult::ok(url, page.content));
                    }
                    Err(e) => {
                        tracing::debug!(%url, error = %e, "page fetch failed");
                        results.push(PageResult::failed(url, e.to_string()));
                    }
                }
            }

            self.publish_progress(&frontier);
        }

        tracing::info!(
            visited = frontier.visited_count(),
            results = results.len(),
            "crawl finished"
        );
        Ok(results)
    }

    /// Fetch an explicit URL list concurrently under the shared gate.
    /// Best-effort: the result list is order-preserving and every entry is
    /// present, failed fetches included.
    pub async fn fetch_many(&self, urls: &[String]) -> Vec<PageResult> {
        let fetches = urls.iter().map(|url| {
            let url = url.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let limiter = Arc::clone(&self.limiter);
            async move {
                let _slot = limiter.acquire().await;
                match fetcher.fetch(&url).await {
                    Ok(page) => PageResult::ok(url, page.content),
                    Err(e) => {
                        tracing::debug!(%url, error = %e, "page fetch failed");
                        PageResult::failed(url, e.to_string())
                    }
                }
            }
        });
        future::join_all(fetches).await
    }

    fn publish_progress(&self, frontier: &CrawlFrontier) {
        self.counters
            .visited
            .store(frontier.visited_count(), Ordering::Relaxed);
        self.counters
            .queued
            .store(frontier.queued_count(), Ordering::Relaxed);
    }
}

/// Resolve raw hrefs against the page they were found on and keep the
/// http(s) ones, fragment-stripped, that fall inside `scope`.
fn resolve_links(page_url: &str, raw_links: &[String], scope: Option<&str>) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for raw in raw_links {
        let Ok(mut resolved) = base.join(raw) else {
            tracing::trace!(href = %raw, "unresolvable link");
            continue;
        };
        resolved.set_fragment(None);

        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        if let Some(scope) = scope {
            if host_key(&resolved).as_deref() != Some(scope) {
                continue;
            }
        }
        links.push(resolved.to_string());
    }
    links
}

/// Network-location key used for the same-domain check: literal host plus
/// explicit port. `www.example.test` and `example.test` are distinct.
fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
