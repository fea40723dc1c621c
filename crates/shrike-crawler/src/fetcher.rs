use crate::Result;
use async_trait::async_trait;

/// Content and raw outbound links harvested from one fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub content: String,
    /// Raw, possibly relative, href strings as found on the page. The
    /// crawler resolves and filters them; no parsing happens here.
    pub discovered_links: Vec<String>,
}

/// External collaborator that turns a URL into page content.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;

    /// Release underlying resources (browser session, sockets).
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
