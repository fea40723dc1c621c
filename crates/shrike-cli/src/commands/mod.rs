pub mod crawl;
pub mod fetch;
pub mod relay;

mod session;
