use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use medreview_browser::BrowserPage;
use medreview_common::Platform;

use super::{RawReview, ReviewExtractor};

/// SberZdorovie embeds the doctor page state in a Next.js data script.
/// The script tag is never visible, so the wait is for attachment only —
/// bot-interstitial pages keep the real document hidden while it loads.
const DATA_SELECTOR: &str = "#__NEXT_DATA__";
const DATA_WAIT: Duration = Duration::from_secs(20);

/// Path from the parsed payload down to the SEO review list.
const REVIEWS_POINTER: &str = "/props/pageProps/preloadedState/doctorPage/doctor/reviewsForSeo";

const READ_DATA_JS: &str = r#"() => {
    const script = document.getElementById('__NEXT_DATA__');
    return script ? script.textContent : null;
}"#;

pub struct SberzdorovieAdapter;

#[async_trait]
impl ReviewExtractor for SberzdorovieAdapter {
    fn platform(&self) -> Platform {
        Platform::Sberzdorovie
    }

    async fn extract(
        &self,
        page: &dyn BrowserPage,
        _want_all: bool,
    ) -> medreview_browser::Result<Vec<RawReview>> {
        if !page.wait_for_selector(DATA_SELECTOR, DATA_WAIT).await? {
            return Ok(Vec::new());
        }

        let value = page.evaluate(READ_DATA_JS).await?;
        let Some(raw) = value.as_str() else {
            return Ok(Vec::new());
        };

        Ok(parse_next_data(raw))
    }
}

/// Descend the embedded payload to the review list. Malformed JSON or a
/// missing key along the path degrades to an empty list.
pub(crate) fn parse_next_data(raw: &str) -> Vec<RawReview> {
    let Ok(data) = serde_json::from_str::<Value>(raw) else {
        return Vec::new();
    };
    let Some(items) = data.pointer(REVIEWS_POINTER).and_then(Value::as_array) else {
        return Vec::new();
    };

    items.iter().map(raw_from_item).collect()
}

fn raw_from_item(item: &Value) -> RawReview {
    // Ratings arrive as fractional 0-5 values; the canonical encoding for
    // this platform is that value x10, truncated (0-50).
    let rating = item
        .pointer("/rating/value")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    RawReview {
        id: stringified(item.get("id")),
        name: text_field(item, "name"),
        date: text_field(item, "isoDate"),
        date_beauty: text_field(item, "date"),
        message: text_field(item, "text"),
        rating: ((rating * 10.0) as i64).to_string(),
    }
}

fn text_field(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Platform ids are numeric in the payload but strings in the canonical
/// record.
fn stringified(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_data(reviews: serde_json::Value) -> String {
        serde_json::json!({
            "props": {
                "pageProps": {
                    "preloadedState": {
                        "doctorPage": {
                            "doctor": { "reviewsForSeo": reviews }
                        }
                    }
                }
            }
        })
        .to_string()
    }

    #[test]
    fn rating_is_rescaled_and_truncated() {
        let raw = next_data(serde_json::json!([
            {"id": 1, "name": "A", "isoDate": "2024-01-05", "date": "5 января",
             "text": "ok", "rating": {"value": 4.7}},
            {"id": 2, "name": "B", "isoDate": "2024-01-06", "date": "6 января",
             "text": "ok", "rating": {"value": 0.0}},
            {"id": 3, "name": "C", "isoDate": "2024-01-07", "date": "7 января",
             "text": "ok", "rating": {"value": 5.0}},
        ]));

        let reviews = parse_next_data(&raw);

        assert_eq!(reviews[0].rating, "47");
        assert_eq!(reviews[1].rating, "0");
        assert_eq!(reviews[2].rating, "50");
    }

    #[test]
    fn numeric_id_is_stringified() {
        let raw = next_data(serde_json::json!([
            {"id": 98765, "name": "A", "text": "ok", "rating": {"value": 4.0}},
        ]));

        let reviews = parse_next_data(&raw);

        assert_eq!(reviews[0].id, "98765");
        assert_eq!(reviews[0].rating, "40");
    }

    #[test]
    fn malformed_payload_yields_empty_list() {
        assert!(parse_next_data("{not json at all").is_empty());
        assert!(parse_next_data("").is_empty());
    }

    #[test]
    fn missing_path_yields_empty_list() {
        let raw = serde_json::json!({"props": {"pageProps": {}}}).to_string();
        assert!(parse_next_data(&raw).is_empty());
    }

    #[test]
    fn missing_rating_defaults_to_zero() {
        let raw = next_data(serde_json::json!([
            {"id": 1, "name": "A", "text": "ok"},
        ]));

        assert_eq!(parse_next_data(&raw)[0].rating, "0");
    }
}
