pub mod client;
pub mod error;
pub mod types;

pub use client::{ChatTransport, HttpTransport, SentimentClient};
pub use error::{Result, SentimentError};
pub use types::{ReviewText, Sentiment, SentimentResult};
