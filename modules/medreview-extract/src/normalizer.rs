use medreview_common::{Platform, Review};

use crate::adapters::RawReview;
use crate::error::FetchError;

/// Map raw adapter output into canonical records.
///
/// Items without message text are dropped here (the "must have message"
/// invariant holds for both platforms). A rating that fails integer
/// coercion is a hard error for the whole request: it means the adapter's
/// extraction rules drifted from the live page structure, which should be
/// loud, not silently absorbed.
pub fn normalize_reviews(
    raw: Vec<RawReview>,
    source: Platform,
) -> Result<Vec<Review>, FetchError> {
    let mut reviews = Vec::with_capacity(raw.len());
    for item in raw {
        if let Some(review) = normalize_one(item, source)? {
            reviews.push(review);
        }
    }
    Ok(reviews)
}

fn normalize_one(raw: RawReview, source: Platform) -> Result<Option<Review>, FetchError> {
    let message = collapse_whitespace(&raw.message);
    if message.is_empty() {
        return Ok(None);
    }

    let rating: i32 = raw.rating.trim().parse().map_err(|_| {
        FetchError::page_load(format!(
            "non-numeric rating {:?} for review {:?} on {source}",
            raw.rating, raw.id
        ))
    })?;

    Ok(Some(Review {
        id: raw.id,
        name: collapse_whitespace(&raw.name),
        date: raw.date,
        date_beauty: raw.date_beauty,
        message,
        rating,
        source,
    }))
}

/// Collapse whitespace runs to single spaces and trim, matching the
/// in-page scripts' `replace(/\s+/g, ' ').trim()`.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(message: &str, rating: &str) -> RawReview {
        RawReview {
            id: "42".to_string(),
            name: "  Иван   Иванов ".to_string(),
            date: "2024-03-10".to_string(),
            date_beauty: "10 марта 2024".to_string(),
            message: message.to_string(),
            rating: rating.to_string(),
        }
    }

    #[test]
    fn builds_canonical_record() {
        let reviews =
            normalize_reviews(vec![raw("Very  attentive\ndoctor", "47")], Platform::Sberzdorovie)
                .unwrap();

        assert_eq!(reviews.len(), 1);
        let review = &reviews[0];
        assert_eq!(review.name, "Иван Иванов");
        assert_eq!(review.message, "Very attentive doctor");
        assert_eq!(review.rating, 47);
        assert_eq!(review.source, Platform::Sberzdorovie);
    }

    #[test]
    fn blank_message_never_becomes_a_review() {
        let reviews = normalize_reviews(
            vec![raw("  \n \t ", "5"), raw("real text", "5")],
            Platform::Prodoctorov,
        )
        .unwrap();

        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].message, "real text");
    }

    #[test]
    fn non_numeric_rating_is_a_hard_error() {
        let err = normalize_reviews(vec![raw("fine", "4.5 stars")], Platform::Prodoctorov)
            .unwrap_err();

        assert_eq!(err.kind(), "Page load error");
        assert!(err.details().contains("non-numeric rating"));
    }
}
