use super::session::{FetchSession, SessionOptions};
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use shrike_crawler::{CrawlConfig, CrawlStats, DomainCrawler, PageResult, ProgressHandle};
use std::path::PathBuf;
use std::time::Duration;

pub struct CrawlArgs {
    pub url: String,
    pub max_pages: usize,
    pub max_concurrent: usize,
    pub rate: usize,
    pub time_window: u64,
    pub proxy: Option<String>,
    pub all_domains: bool,
    pub output: Option<PathBuf>,
    pub chrome_path: Option<PathBuf>,
    pub headed: bool,
}

pub fn execute(args: CrawlArgs) -> Result<()> {
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

        let config = CrawlConfig {
            max_pages: args.max_pages,
            max_concurrent: args.max_concurrent,
            same_domain_only: !args.all_domains,
        };
        let mut crawler = DomainCrawler::new(session.fetcher.clone(), config);

        println!("🕸️  Crawling {} (up to {} pages)", args.url, args.max_pages);
        let (bar, poller) = spawn_progress_bar(crawler.progress_handle(), args.max_pages);

        let crawl_result = crawler.crawl(&args.url).await;
        poller.abort();
        bar.finish_and_clear();

        // Browser and relay come down even when the crawl failed.
        let close_result = session.close().await;
        let results = crawl_result?;
        close_result?;

        print_summary(&results);
        if let Some(output) = &args.output {
            write_results(output, &results)?;
        }
        Ok(())
    })
}

fn spawn_progress_bar(
    handle: ProgressHandle,
    max_pages: usize,
) -> (ProgressBar, tokio::task::JoinHandle<()>) {
    let bar = ProgressBar::new(max_pages as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {pos}/{len} pages visited ({msg} queued)")
            .expect("static template is valid"),
    );

    let ticker = bar.clone();
    let poller = tokio::spawn(async move {
        loop {
            let progress = handle.snapshot();
            ticker.set_position(progress.visited as u64);
            ticker.set_message(progress.queued.to_string());
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });
    (bar, poller)
}

pub(super) fn print_summary(results: &[PageResult]) {
    let stats = CrawlStats::from_results(results);
    println!();
    println!(
        "📊 {} pages: {} ok, {} failed ({:.1}% success)",
        stats.total_pages,
        style(stats.successful).green(),
        style(stats.failed).red(),
        stats.success_rate
    );

    for result in results.iter().filter(|r| !r.success) {
        println!(
            "   {} {} - {}",
            style("✗").red(),
            result.url,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}

pub(super) fn write_results(output: &PathBuf, results: &[PageResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(output, json)?;
    println!("✅ Results written to: {}", output.display());
    Ok(())
}
