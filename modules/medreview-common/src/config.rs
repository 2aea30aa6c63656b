use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub host: String,
    pub port: u16,

    // Browser
    pub user_data_dir: String,
    pub headless: bool,

    // Screenshots
    pub save_screenshot: bool,
    pub screenshot_dir: String,

    // Sentiment classification; None disables the /checkSentiment endpoint.
    pub ai: Option<AiConfig>,
}

/// Chat-completions endpoint settings. All three vars must be present for
/// sentiment classification to be enabled.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if a present var fails to parse.
    pub fn from_env() -> Self {
        let ai = match (
            env::var("AI_API_URL"),
            env::var("AI_API_KEY"),
            env::var("AI_MODEL"),
        ) {
            (Ok(api_url), Ok(api_key), Ok(model)) => Some(AiConfig {
                api_url,
                api_key,
                model,
            }),
            _ => None,
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "9000".to_string())
                .parse()
                .expect("PORT must be a number"),
            user_data_dir: env::var("USER_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            headless: bool_env("HEADLESS", false),
            save_screenshot: bool_env("SAVE_SCREENSHOT", true),
            screenshot_dir: env::var("SCREENSHOT_DIR")
                .unwrap_or_else(|_| "screenshots".to_string()),
            ai,
        }
    }
}

fn bool_env(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => v.to_lowercase() == "true",
        Err(_) => default,
    }
}
