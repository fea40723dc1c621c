use crate::chrome_finder::ChromeFinder;
use crate::{Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// Options for the Chromium session backing a fetch run.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit browser binary; autodetected when unset.
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// `host:port` handed to `--proxy-server`. Point this at the local
    /// auth relay when the upstream proxy needs credentials.
    pub proxy_server: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            proxy_server: None,
            user_agent: None,
        }
    }
}

/// A launched Chromium process plus its CDP event-handler task.
pub struct HeadlessChrome {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl HeadlessChrome {
    pub async fn launch(opts: LaunchOptions) -> Result<Self> {
        let binary = ChromeFinder::new(opts.chrome_path.clone()).find()?;
        tracing::info!(binary = %binary.display(), "launching browser");

        let mut builder = BrowserConfig::builder().chrome_executable(binary);
        if !opts.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if let Some(proxy) = &opts.proxy_server {
            builder = builder.arg(format!("--proxy-server={proxy}"));
            tracing::debug!(%proxy, "routing browser traffic through proxy");
        }
        if let Some(user_agent) = &opts.user_agent {
            builder = builder.arg(format!("--user-agent={user_agent}"));
        }

        let config = builder.build().map_err(Error::Browser)?;
        let (browser, mut handler) = Browser::launch(config).await?;

        // The handler stream must be polled for any CDP command to make
        // progress; individual event errors are not fatal.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close the browser and stop the handler task.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        self.handler_task.abort();
        tracing::debug!("browser closed");
        Ok(())
    }
}
