use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "shrike")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Rate-limited site crawling through authenticated upstream proxies",
    long_about = "Shrike crawls sites with a headless browser under rate and concurrency \
                  admission control. When the upstream proxy needs credentials, a local \
                  relay injects them so the browser never sees an auth prompt."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a site breadth-first from a seed URL
    Crawl {
        /// Seed URL to start from
        #[arg(value_name = "URL")]
        url: String,

        /// Maximum number of pages to visit
        #[arg(long, default_value_t = 50)]
        max_pages: usize,

        /// Maximum concurrent page fetches
        #[arg(long, default_value_t = 3)]
        max_concurrent: usize,

        /// Requests admitted per time window
        #[arg(long, default_value_t = 10)]
        rate: usize,

        /// Rate-limit window in seconds
        #[arg(long, default_value_t = 60)]
        time_window: u64,

        /// Upstream proxy URL (scheme://[user:pass@]host:port)
        #[arg(long)]
        proxy: Option<String>,

        /// Follow links to other domains too
        #[arg(long)]
        all_domains: bool,

        /// Write page results to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to the Chrome/Chromium binary
        #[arg(long)]
        chrome_path: Option<PathBuf>,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
    },

    /// Fetch an explicit list of URLs concurrently
    Fetch {
        /// URLs to fetch
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Maximum concurrent page fetches
        #[arg(long, default_value_t = 3)]
        max_concurrent: usize,

        /// Requests admitted per time window
        #[arg(long, default_value_t = 10)]
        rate: usize,

        /// Rate-limit window in seconds
        #[arg(long, default_value_t = 60)]
        time_window: u64,

        /// Upstream proxy URL (scheme://[user:pass@]host:port)
        #[arg(long)]
        proxy: Option<String>,

        /// Write page results to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to the Chrome/Chromium binary
        #[arg(long)]
        chrome_path: Option<PathBuf>,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
    },

    /// Run the local auth relay on its own until Ctrl+C
    Relay {
        /// Upstream proxy URL (scheme://[user:pass@]host:port)
        #[arg(long)]
        proxy: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Crawl {
            url,
            max_pages,
            max_concurrent,
            rate,
            time_window,
            proxy,
            all_domains,
            output,
            chrome_path,
            headed,
        } => commands::crawl::execute(commands::crawl::CrawlArgs {
            url,
            max_pages,
            max_concurrent,
            rate,
            time_window,
            proxy,
            all_domains,
            output,
            chrome_path,
            headed,
        }),
        Commands::Fetch {
            urls,
            max_concurrent,
            rate,
            time_window,
            proxy,
            output,
            chrome_path,
            headed,
        } => commands::fetch::execute(commands::fetch::FetchArgs {
            urls,
            max_concurrent,
            rate,
            time_window,
            proxy,
            output,
            chrome_path,
            headed,
        }),
        Commands::Relay { proxy } => commands::relay::execute(&proxy),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "shrike=debug,shrike_core=debug,shrike_proxy=debug,shrike_crawler=debug,shrike_browser=debug",
        )
    } else {
        EnvFilter::new("shrike=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
