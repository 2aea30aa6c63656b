use thiserror::Error;

pub type Result<T> = std::result::Result<T, SentimentError>;

/// Failure taxonomy for a classification call. Rate limiting is surfaced
/// apart from generic endpoint errors and from local parse failures so a
/// caller can tell "retry later" from a broken prompt/response contract.
#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("AI API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI response was not valid JSON: {raw}")]
    InvalidResponse { raw: String },

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for SentimentError {
    fn from(err: reqwest::Error) -> Self {
        SentimentError::Network(err.to_string())
    }
}
