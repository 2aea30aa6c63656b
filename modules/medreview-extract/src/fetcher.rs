use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use medreview_browser::{BrowserPage, BrowserSession};
use medreview_common::{Platform, Review};

use crate::adapters::adapter_for;
use crate::error::FetchError;
use crate::normalizer::normalize_reviews;
use crate::url::normalize_url;

/// Bound on page navigation, matching the slowest interstitial-heavy loads.
const NAV_TIMEOUT: Duration = Duration::from_secs(60);
/// Pause after load so client-side rendering can settle.
const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Result of one fetch: page title, canonical records, and the screenshot
/// path when snapshotting is enabled.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub title: String,
    pub reviews: Vec<Review>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Writes full-page captures named by a content hash of the URL plus a
/// minute-granularity timestamp.
pub struct ScreenshotStore {
    dir: PathBuf,
}

impl ScreenshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn save(&self, url: &str, png: &[u8]) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(url);
        std::fs::write(&path, png)?;
        Ok(path)
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M");
        self.dir.join(format!("{timestamp}_{digest}.png"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Composes the browser session, platform adapter and normalizer into one
/// request: open a scoped page, navigate, extract, optionally snapshot,
/// always release the page.
pub struct ReviewFetcher {
    session: Arc<BrowserSession>,
    screenshots: Option<ScreenshotStore>,
}

impl ReviewFetcher {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self {
            session,
            screenshots: None,
        }
    }

    pub fn with_screenshots(mut self, store: ScreenshotStore) -> Self {
        self.screenshots = Some(store);
        self
    }

    /// Fetch reviews for one doctor page. Any failure after the page opens
    /// comes back as a structured page-load error; the page is closed on
    /// every path.
    pub async fn fetch(
        &self,
        url: &str,
        platform: Platform,
        all_reviews: bool,
    ) -> Result<FetchResult, FetchError> {
        let url = normalize_url(url, platform, all_reviews);
        info!(%url, %platform, all_reviews, "Fetching reviews");

        // Always a fresh page: warm-up tabs stay untouched and concurrent
        // fetches never share a page.
        let page = self.session.open_page().await?;
        fetch_on(&page, &url, platform, all_reviews, self.screenshots.as_ref()).await
    }
}

/// Run one fetch against an already-opened page, then close it
/// unconditionally. Split from `ReviewFetcher::fetch` so the
/// close-on-every-path contract is testable without a browser.
pub(crate) async fn fetch_on(
    page: &dyn BrowserPage,
    url: &str,
    platform: Platform,
    all_reviews: bool,
    screenshots: Option<&ScreenshotStore>,
) -> Result<FetchResult, FetchError> {
    let outcome = run_fetch(page, url, platform, all_reviews, screenshots).await;
    if let Err(e) = page.close().await {
        warn!(error = %e, "Failed to close page after fetch");
    }
    outcome
}

async fn run_fetch(
    page: &dyn BrowserPage,
    url: &str,
    platform: Platform,
    all_reviews: bool,
    screenshots: Option<&ScreenshotStore>,
) -> Result<FetchResult, FetchError> {
    page.navigate(url, NAV_TIMEOUT).await?;
    tokio::time::sleep(SETTLE_DELAY).await;

    let title = page.title().await?;

    let adapter = adapter_for(platform);
    let raw = adapter.extract(page, all_reviews).await?;
    let reviews = normalize_reviews(raw, platform)?;
    info!(count = reviews.len(), %platform, "Extracted reviews");

    let screenshot = match screenshots {
        Some(store) => {
            let png = page.screenshot_png().await?;
            let path = store
                .save(url, &png)
                .map_err(|e| FetchError::page_load(format!("screenshot write failed: {e}")))?;
            Some(path.display().to_string())
        }
        None => None,
    };

    Ok(FetchResult {
        title,
        reviews,
        screenshot,
    })
}
