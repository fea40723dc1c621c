use crate::route::ProxyRoute;
use crate::tunnel;
use crate::{Error, Result};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Local relay fronting a credential-protected upstream proxy.
///
/// The browser's proxy setting points at the loopback port this server
/// binds; each accepted connection is forwarded to the upstream with
/// `Proxy-Authorization` injected, so the automated page never sees an
/// auth prompt and never learns the credentials.
pub struct RelayServer {
    route: ProxyRoute,
    local_port: Option<u16>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl RelayServer {
    pub fn new(route: ProxyRoute) -> Self {
        Self {
            route,
            local_port: None,
            shutdown: None,
        }
    }

    /// Bind an ephemeral loopback port, start accepting, and return the
    /// bound port.
    pub async fn start(&mut self) -> Result<u16> {
        if self.shutdown.is_some() {
            return Err(Error::Relay("relay already started".into()));
        }

        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let route = self.route.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::debug!("relay listener shutting down");
                        break;
                    }
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((client, peer)) => {
                                let route = route.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = tunnel::run(client, &route).await {
                                        tracing::warn!(%peer, error = %e, "tunnel session failed");
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "accept failed");
                            }
                        }
                    }
                }
            }
        });

        self.shutdown = Some(shutdown_tx);
        self.local_port = Some(local_addr.port());
        tracing::info!(
            local = %local_addr,
            upstream = %self.route.authority(),
            "local auth relay started"
        );
        Ok(local_addr.port())
    }

    /// Stop accepting new connections. In-flight tunnels are left to
    /// drain on their own.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
            tracing::info!("local auth relay stopped");
        }
        self.local_port = None;
    }

    /// Port the relay is listening on, while running.
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    pub fn route(&self) -> &ProxyRoute {
        &self.route
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.stop();
    }
}
