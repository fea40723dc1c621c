use anyhow::Result;
use shrike_proxy::{ProxyRoute, RelayServer};

pub fn execute(proxy: &str) -> Result<()> {
    let route = ProxyRoute::parse(proxy)?;
    if !route.has_credentials() {
        println!("⚠️  Proxy URL carries no credentials; relaying without auth injection");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut relay = RelayServer::new(route);
        let port = relay.start().await?;

        println!("✓ Local auth relay listening on 127.0.0.1:{port}");
        println!();
        println!("Point your browser or application at this proxy:");
        println!("  HTTP Proxy:  127.0.0.1:{port}");
        println!("  HTTPS Proxy: 127.0.0.1:{port}");
        println!();
        println!("Press Ctrl+C to stop...");

        tokio::signal::ctrl_c().await?;
        println!();
        println!("🛑 Stopping relay (open tunnels drain on their own)...");
        relay.stop();

        Ok(())
    })
}
