pub mod adapters;
pub mod error;
pub mod fetcher;
pub mod normalizer;
pub mod testing;
pub mod url;

pub use adapters::{adapter_for, RawReview, ReviewExtractor};
pub use error::FetchError;
pub use fetcher::{FetchResult, ReviewFetcher, ScreenshotStore};
pub use url::normalize_url;
