pub mod config;
pub mod types;

pub use config::{AiConfig, Config};
pub use types::{Platform, Review};
