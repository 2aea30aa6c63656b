use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use medreview_common::Platform;

use crate::error::{BrowserError, Result};
use crate::page::CdpPage;

/// Bound on each warm-up navigation.
const WARMUP_TIMEOUT: Duration = Duration::from_secs(60);

/// One persistent browser context per process.
///
/// The profile lives in `user_data_dir`, so cookies and fingerprint state
/// survive restarts by design. Pages are transient children: `open_page`
/// hands ownership to the caller, who must close on every path. The
/// warm-up pages opened at startup belong to the session and are never
/// served to fetches.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch the browser over the on-disk profile.
    pub async fn launch(user_data_dir: &str, headless: bool) -> Result<Self> {
        info!(user_data_dir, headless, "Launching browser");

        let mut config = BrowserConfig::builder()
            .user_data_dir(user_data_dir)
            .window_size(1280, 1024)
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage");
        if !headless {
            config = config.with_head();
        }
        let config = config.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The CDP event stream must be drained for the connection to make
        // progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler error");
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Open one background page per platform host to pre-establish session
    /// state before the first real fetch. Pages restored from the profile
    /// count as already open; leftover blank pages are reused instead of
    /// spawning new windows. Failures here are logged and never abort
    /// startup.
    pub async fn warm_up(&self) {
        info!("Warming up browser: checking background tabs");
        if let Err(e) = self.try_warm_up().await {
            warn!(error = %e, "Browser warm-up failed");
        }
        info!("Browser warm-up complete");
    }

    async fn try_warm_up(&self) -> Result<()> {
        let pages = self.browser.pages().await?;

        let mut open_urls = Vec::new();
        let mut blank_pages: Vec<Page> = Vec::new();
        for page in pages {
            let url = page.url().await?.unwrap_or_default();
            if url == "about:blank" {
                blank_pages.push(page);
            }
            open_urls.push(url);
        }

        for platform in Platform::ALL {
            if open_urls.iter().any(|u| u.contains(platform.host_marker())) {
                continue;
            }
            info!(%platform, url = platform.warmup_url(), "Opening warm-up page");
            let page = match blank_pages.pop() {
                Some(page) => page,
                None => self.browser.new_page("about:blank").await?,
            };
            tokio::time::timeout(WARMUP_TIMEOUT, page.goto(platform.warmup_url()))
                .await
                .map_err(|_| {
                    BrowserError::Navigation(format!(
                        "warm-up navigation to {} timed out",
                        platform.warmup_url()
                    ))
                })??;
        }

        Ok(())
    }

    /// Create a fresh page for one fetch. Warm-up pages are never returned
    /// here; every call yields a new child page that the caller must pair
    /// with a guaranteed close, including on error paths.
    pub async fn open_page(&self) -> Result<CdpPage> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(CdpPage::new(page))
    }

    /// Shut the browser down. The profile directory stays on disk.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        self.handler_task.abort();
        Ok(())
    }
}
