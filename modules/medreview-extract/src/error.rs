use thiserror::Error;

use medreview_browser::BrowserError;

/// Per-request fetch failure. Everything that goes wrong between opening a
/// page and handing back records — navigation, rating coercion, screenshot
/// I/O — collapses into a page-load failure scoped to that one request.
/// Extraction-shape drift is deliberately NOT here: it degrades to an
/// empty review list instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Page load error: {details}")]
    PageLoad { details: String },
}

impl FetchError {
    pub fn page_load(details: impl Into<String>) -> Self {
        FetchError::PageLoad {
            details: details.into(),
        }
    }

    /// Short error kind for the wire `{error, details}` payload.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::PageLoad { .. } => "Page load error",
        }
    }

    pub fn details(&self) -> &str {
        match self {
            FetchError::PageLoad { details } => details,
        }
    }
}

impl From<BrowserError> for FetchError {
    fn from(err: BrowserError) -> Self {
        FetchError::PageLoad {
            details: err.to_string(),
        }
    }
}
