use crate::launch::HeadlessChrome;
use crate::{Error, Result};
use async_trait::async_trait;
use shrike_core::AdaptiveRateLimiter;
use shrike_crawler::{FetchedPage, PageFetcher};
use std::sync::Arc;
use tokio::sync::RwLock;

const DISCOVER_LINKS_SCRIPT: &str = "Array.from(document.links).map(a => a.href)";

/// [`PageFetcher`] backed by a live Chromium session.
///
/// Every fetch first passes through the shared adaptive rate limiter, and
/// its outcome feeds the limiter's AIMD adjustment, so repeated page
/// failures back the whole scraper off while steady success ramps it up.
pub struct BrowserFetcher {
    chrome: RwLock<Option<HeadlessChrome>>,
    rate: Arc<AdaptiveRateLimiter>,
}

impl BrowserFetcher {
    pub fn new(chrome: HeadlessChrome, rate: Arc<AdaptiveRateLimiter>) -> Self {
        Self {
            chrome: RwLock::new(Some(chrome)),
            rate,
        }
    }

    pub fn rate_limiter(&self) -> Arc<AdaptiveRateLimiter> {
        Arc::clone(&self.rate)
    }

    async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        let chrome = self.chrome.read().await;
        let Some(chrome) = chrome.as_ref() else {
            return Err(Error::Browser("browser already closed".into()));
        };

        let page = chrome.browser().new_page(url).await?;
        let result = async {
            page.wait_for_navigation().await?;
            let content = page.content().await?;
            let discovered_links: Vec<String> = page
                .evaluate(DISCOVER_LINKS_SCRIPT)
                .await?
                .into_value()
                .map_err(|e| Error::Cdp(e.to_string()))?;
            Ok(FetchedPage {
                content,
                discovered_links,
            })
        }
        .await;

        // The page is closed whether or not the fetch succeeded.
        let _ = page.close().await;
        result
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> shrike_crawler::Result<FetchedPage> {
        self.rate.acquire().await;
        tracing::debug!(url, "fetching page");

        match self.fetch_page(url).await {
            Ok(page) => {
                self.rate.record_success().await;
                Ok(page)
            }
            Err(e) => {
                self.rate.record_error().await;
                Err(shrike_crawler::Error::Fetch(e.to_string()))
            }
        }
    }

    async fn close(&self) -> shrike_crawler::Result<()> {
        if let Some(chrome) = self.chrome.write().await.take() {
            chrome
                .close()
                .await
                .map_err(|e| shrike_crawler::Error::Fetch(e.to_string()))?;
        }
        Ok(())
    }
}
