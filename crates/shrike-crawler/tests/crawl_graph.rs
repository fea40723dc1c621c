use async_trait::async_trait;
use shrike_crawler::{
    CrawlConfig, CrawlStats, DomainCrawler, Error, FetchedPage, PageFetcher, Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

/// In-memory site graph standing in for the browser collaborator.
struct FakeFetcher {
    pages: HashMap<String, Vec<String>>,
    failing: Vec<String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn new(pages: &[(&str, &[&str])]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, links)| {
                    (
                        url.to_string(),
                        links.iter().map(|l| l.to_string()).collect(),
                    )
                })
                .collect(),
            failing: Vec::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    fn with_failing(mut self, urls: &[&str]) -> Self {
        self.failing = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.failing.iter().any(|u| u == url) {
            return Err(Error::Fetch(format!("simulated failure for {url}")));
        }
        let links = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("no such page: {url}")))?;
        Ok(FetchedPage {
            content: format!("<html>{url}</html>"),
            discovered_links: links,
        })
    }
}

/// `A -> {B, C, offsite}`, `B -> {A}`, `C -> {}` on example.test.
fn site_graph() -> FakeFetcher {
    FakeFetcher::new(&[
        (
            "https://example.test/",
            &["/b", "/c", "https://other.test/"][..],
        ),
        ("https://example.test/b", &["/"][..]),
        ("https://example.test/c", &[][..]),
    ])
}

fn crawler(fetcher: FakeFetcher, config: CrawlConfig) -> DomainCrawler<FakeFetcher> {
    DomainCrawler::new(Arc::new(fetcher), config)
}

fn shared_crawler(
    fetcher: FakeFetcher,
    config: CrawlConfig,
) -> (Arc<FakeFetcher>, DomainCrawler<FakeFetcher>) {
    let fetcher = Arc::new(fetcher);
    let crawler = DomainCrawler::new(Arc::clone(&fetcher), config);
    (fetcher, crawler)
}

#[tokio::test]
async fn test_page_budget_bounds_crawl() {
    let mut crawler = crawler(
        site_graph(),
        CrawlConfig {
            max_pages: 2,
            max_concurrent: 1,
            same_domain_only: true,
        },
    );

    let results = crawler.crawl("https://example.test/").await.unwrap();
    assert_eq!(results.len(), 2);

    let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert!(urls.iter().all(|u| u.starts_with("https://example.test/")));

    // No URL visited twice.
    let mut deduped = urls.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), urls.len());
}

#[tokio::test]
async fn test_offsite_links_never_fetched() {
    let (fetcher, mut crawler) = shared_crawler(site_graph(), CrawlConfig::default());

    crawler.crawl("https://example.test/").await.unwrap();

    assert!(!fetcher.fetched().iter().any(|u| u.contains("other.test")));
}

#[tokio::test]
async fn test_cycle_visits_each_page_once() {
    let (fetcher, mut crawler) = shared_crawler(site_graph(), CrawlConfig::default());

    let results = crawler.crawl("https://example.test/").await.unwrap();

    // A, B and C, despite B linking back to A.
    assert_eq!(results.len(), 3);
    assert_eq!(fetcher.fetched().len(), 3);
}

#[tokio::test]
async fn test_all_domains_mode_follows_offsite_links() {
    let fetcher = FakeFetcher::new(&[
        ("https://example.test/", &["https://other.test/"][..]),
        ("https://other.test/", &[][..]),
    ]);
    let mut crawler = crawler(
        fetcher,
        CrawlConfig {
            same_domain_only: false,
            ..CrawlConfig::default()
        },
    );

    let results = crawler.crawl("https://example.test/").await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().any(|r| r.url == "https://other.test/"));
}

#[tokio::test]
async fn test_failed_page_is_isolated() {
    let fetcher = site_graph().with_failing(&["https://example.test/c"]);
    let mut crawler = crawler(fetcher, CrawlConfig::default());

    let results = crawler.crawl("https://example.test/").await.unwrap();
    assert_eq!(results.len(), 3);

    let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].url, "https://example.test/c");
    assert!(
        failed[0]
            .error
            .as_deref()
            .unwrap()
            .contains("simulated failure")
    );

    let stats = CrawlStats::from_results(&results);
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_crawl_is_idempotent_across_runs() {
    let first = {
        let mut crawler = crawler(site_graph(), CrawlConfig::default());
        crawler.crawl("https://example.test/").await.unwrap().len()
    };
    let second = {
        let mut crawler = crawler(site_graph(), CrawlConfig::default());
        crawler.crawl("https://example.test/").await.unwrap().len()
    };
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_progress_reflects_final_state() {
    let mut crawler = crawler(site_graph(), CrawlConfig::default());
    let handle = crawler.progress_handle();

    let results = crawler.crawl("https://example.test/").await.unwrap();

    let progress = handle.snapshot();
    assert_eq!(progress.visited, results.len());
    assert_eq!(progress.queued, 0);
    assert_eq!(progress.total, progress.visited);
    assert_eq!(progress.max_pages, 50);
}

#[tokio::test]
async fn test_invalid_seed_is_an_error() {
    let mut crawler = crawler(site_graph(), CrawlConfig::default());
    assert!(crawler.crawl("not a url").await.is_err());
}

#[tokio::test]
async fn test_fetch_many_preserves_order_and_isolates_failures() {
    let fetcher = site_graph().with_failing(&["https://example.test/b"]);
    let crawler = crawler(fetcher, CrawlConfig::default());

    let urls = vec![
        "https://example.test/".to_string(),
        "https://example.test/b".to_string(),
        "https://example.test/c".to_string(),
    ];
    let results = crawler.fetch_many(&urls).await;

    assert_eq!(results.len(), 3);
    for (result, url) in results.iter().zip(&urls) {
        assert_eq!(&result.url, url);
    }
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[2].success);
}
