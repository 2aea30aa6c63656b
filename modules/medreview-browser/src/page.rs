use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};

use crate::error::{BrowserError, Result};

/// How often the selector wait re-queries the DOM.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A single browser page, privately owned by the fetch that created it.
///
/// This is the seam between the orchestrator and the browser engine: the
/// real implementation drives CDP, tests substitute a mock so extraction
/// logic runs without a browser.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the load to settle, bounded by `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Current document title.
    async fn title(&self) -> Result<String>;

    /// Wait until `selector` matches an attached element. Attached, not
    /// visible — bot-interstitial pages may keep the element hidden.
    /// Returns `false` on timeout rather than failing.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Evaluate a script (expression or arrow-function source) in the page
    /// and return its result as JSON.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Capture a full-page PNG.
    async fn screenshot_png(&self) -> Result<Vec<u8>>;

    /// Close the page. Callers must reach this on every exit path.
    async fn close(&self) -> Result<()>;
}

/// `BrowserPage` backed by a chromiumoxide CDP page.
pub struct CdpPage {
    page: Page,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }
}

#[async_trait]
impl BrowserPage for CdpPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let nav = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };
        tokio::time::timeout(timeout, nav)
            .await
            .map_err(|_| {
                BrowserError::Navigation(format!(
                    "navigation to {url} timed out after {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| BrowserError::Navigation(e.to_string()))
    }

    async fn title(&self) -> Result<String> {
        let value = self.evaluate("document.title").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        // CDP has no attached-state wait, so poll the DOM until the
        // deadline. find_element matches attached elements regardless of
        // visibility.
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| BrowserError::Evaluation(e.to_string()))
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| BrowserError::Screenshot(e.to_string()))
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))
    }
}
