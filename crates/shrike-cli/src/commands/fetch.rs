use super::session::{FetchSession, SessionOptions};
use anyhow::Result;
use shrike_crawler::{CrawlConfig, DomainCrawler};
use std::path::PathBuf;

pub struct FetchArgs {
    pub urls: Vec<String>,
    pub max_concurrent: usize,
    pub rate: usize,
    pub time_window: u64,
    pub proxy: Option<String>,
    pub output: Option<PathBuf>,
    pub chrome_path: Option<PathBuf>,
    pub headed: bool,
}

pub fn execute(args: FetchArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let session = FetchSession::open(SessionOptions {
            proxy: args.proxy.clone(),
            rate: args.rate,
            time_window: args.time_window,
            chrome_path: args.chrome_path.clone(),
            headed: args.headed,
        })
        .await?;

        let crawler = DomainCrawler::new(
            session.fetcher.clone(),
            CrawlConfig {
                max_concurrent: args.max_concurrent,
                ..CrawlConfig::default()
            },
        );

        println!("🕸️  Fetching {} URLs", args.urls.len());
        let results = crawler.fetch_many(&args.urls).await;

        session.close().await?;

        super::crawl::print_summary(&results);
        if let Some(output) = &args.output {
            super::crawl::write_results(output, &results)?;
        }
        Ok(())
    })
}
