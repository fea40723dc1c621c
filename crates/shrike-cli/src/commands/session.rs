use anyhow::Result;
use shrike_browser::{BrowserFetcher, HeadlessChrome, LaunchOptions};
use shrike_core::AdaptiveRateLimiter;
use shrike_crawler::PageFetcher;
use shrike_proxy::{ProxyRoute, RelayServer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A ready-to-fetch browser session: optional auth relay, launched
/// Chromium, and the shared adaptive rate limiter. Common to the `crawl`
/// and `fetch` commands.
pub struct FetchSession {
    pub fetcher: Arc<BrowserFetcher>,
    relay: Option<RelayServer>,
}

pub struct SessionOptions {
    pub proxy: Option<String>,
    pub rate: usize,
    pub time_window: u64,
    pub chrome_path: Option<PathBuf>,
    pub headed: bool,
}

impl FetchSession {
    pub async fn open(opts: SessionOptions) -> Result<Self> {
        let mut relay = None;
        let proxy_server = match &opts.proxy {
            Some(proxy_url) => {
                let route = ProxyRoute::parse(proxy_url)?;
                if route.has_credentials() {
                    let mut server = RelayServer::new(route);
                    let port = server.start().await?;
                    println!("🔐 Local auth relay on 127.0.0.1:{port}");
                    relay = Some(server);
                    Some(format!("127.0.0.1:{port}"))
                } else {
                    // Credential-free proxies go straight into the browser.
                    Some(route.authority())
                }
            }
            None => None,
        };

        println!("🚀 Launching browser...");
        let chrome = HeadlessChrome::launch(LaunchOptions {
            chrome_path: opts.chrome_path,
            headless: !opts.headed,
            proxy_server,
            user_agent: None,
        })
        .await?;

        let rate = Arc::new(AdaptiveRateLimiter::new(
            opts.rate,
            Duration::from_secs(opts.time_window),
        ));
        let fetcher = Arc::new(BrowserFetcher::new(chrome, rate));

        Ok(Self { fetcher, relay })
    }

    pub async fn close(mut self) -> Result<()> {
        self.fetcher.close().await?;
        if let Some(relay) = self.relay.as_mut() {
            relay.stop();
        }
        Ok(())
    }
}
