pub mod prodoctorov;
pub mod sberzdorovie;

use async_trait::async_trait;
use serde::Deserialize;

use medreview_browser::BrowserPage;
use medreview_common::Platform;

/// Raw review fields as pulled off the page, before normalization.
/// `rating` stays a string here; coercion to an integer happens at the
/// normalizer boundary where a failure is a hard per-request error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReview {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub date_beauty: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub rating: String,
}

/// Per-platform extraction rules: each variant encapsulates its own
/// readiness wait, extraction query and raw field mapping against an
/// already-navigated page.
#[async_trait]
pub trait ReviewExtractor: Send + Sync {
    fn platform(&self) -> Platform;

    /// Pull raw reviews from the rendered page. A readiness timeout or an
    /// unexpected page shape yields an empty set, never an error — page
    /// structure drift is expected over time and partial availability is
    /// preferred over failing the request.
    async fn extract(
        &self,
        page: &dyn BrowserPage,
        want_all: bool,
    ) -> medreview_browser::Result<Vec<RawReview>>;
}

/// Select the adapter for a platform.
pub fn adapter_for(platform: Platform) -> Box<dyn ReviewExtractor> {
    match platform {
        Platform::Sberzdorovie => Box::new(sberzdorovie::SberzdorovieAdapter),
        Platform::Prodoctorov => Box::new(prodoctorov::ProdoctorovAdapter),
    }
}
