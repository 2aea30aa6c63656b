use std::fmt;

use serde::{Deserialize, Serialize};

/// Review-hosting platform a fetch targets. Each platform has its own page
/// structure and extraction rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Sberzdorovie,
    Prodoctorov,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Sberzdorovie, Platform::Prodoctorov];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Sberzdorovie => "sberzdorovie",
            Platform::Prodoctorov => "prodoctorov",
        }
    }

    /// Host whose main page is opened during session warm-up.
    /// SberZdorovie still serves doctor pages under its old docdoc.ru domain.
    pub fn warmup_url(&self) -> &'static str {
        match self {
            Platform::Sberzdorovie => "https://docdoc.ru",
            Platform::Prodoctorov => "https://prodoctorov.ru",
        }
    }

    /// Substring that identifies this platform's host in a page URL.
    pub fn host_marker(&self) -> &'static str {
        match self {
            Platform::Sberzdorovie => "docdoc.ru",
            Platform::Prodoctorov => "prodoctorov.ru",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical review record returned to callers.
///
/// `message` is always nonempty — raw items without message text are dropped
/// during extraction. `id` may be an empty string when the page exposes none.
/// `rating` is on the platform's own scale: SberZdorovie's fractional 0-5 is
/// rescaled x10 into 0-50, ProDoctorov passes its native integer through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub name: String,
    /// ISO-8601 date; empty if the platform omits it.
    pub date: String,
    /// Human-readable original date string.
    pub date_beauty: String,
    pub message: String,
    pub rating: i32,
    pub source: Platform,
}
