use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use medreview_browser::BrowserPage;
use medreview_common::Platform;

use super::{RawReview, ReviewExtractor};

const CARD_SELECTOR: &str = ".b-review-card";
const CARD_WAIT: Duration = Duration::from_secs(15);

/// Default page size on ProDoctorov. Without the `/otzivi` suffix the page
/// paginates, and only the first 20 cards correspond to the visible
/// default page.
pub(crate) const DEFAULT_PAGE_SIZE: usize = 20;

/// One pass over all review cards. Field pulls mirror the page's
/// microdata markup; whitespace is collapsed in-page the same way for
/// every text node.
const COLLECT_CARDS_JS: &str = r#"() => {
    const collapse = (s) => s.replace(/\s+/g, ' ').trim();
    return Array.from(document.querySelectorAll('.b-review-card')).map(card => {
        const reviewBody = card.querySelector('div[itemprop="reviewBody"]');
        const authorLink = card.querySelector('.b-review-card__author-link');
        const dateElem = card.querySelector('div[itemprop="datePublished"]');
        const messageElem = card.querySelector('.b-review-card__comment');
        const ratingElem = card.querySelector('meta[itemprop="ratingValue"]');
        return {
            id: reviewBody ? (reviewBody.getAttribute('data') || '') : '',
            name: authorLink ? collapse(authorLink.textContent) : '',
            date: dateElem ? (dateElem.getAttribute('content') || '') : '',
            date_beauty: dateElem ? collapse(dateElem.textContent) : '',
            message: messageElem ? collapse(messageElem.textContent) : '',
            rating: ratingElem ? (ratingElem.getAttribute('content') || '0') : '0'
        };
    });
}"#;

pub struct ProdoctorovAdapter;

#[async_trait]
impl ReviewExtractor for ProdoctorovAdapter {
    fn platform(&self) -> Platform {
        Platform::Prodoctorov
    }

    async fn extract(
        &self,
        page: &dyn BrowserPage,
        want_all: bool,
    ) -> medreview_browser::Result<Vec<RawReview>> {
        if !page.wait_for_selector(CARD_SELECTOR, CARD_WAIT).await? {
            return Ok(Vec::new());
        }

        let value = page.evaluate(COLLECT_CARDS_JS).await?;
        let cards: Vec<RawReview> = match serde_json::from_value(value) {
            Ok(cards) => cards,
            Err(e) => {
                warn!(error = %e, "Unexpected card shape from extraction script");
                Vec::new()
            }
        };

        Ok(collect_cards(cards, want_all))
    }
}

/// Apply the default-page cap, then keep only cards that carry comment
/// text. Cap first: the first 20 cards in DOM order are the visible page,
/// and a blank card among them does not pull a 21st into the result.
pub(crate) fn collect_cards(cards: Vec<RawReview>, want_all: bool) -> Vec<RawReview> {
    let cap = if want_all {
        usize::MAX
    } else {
        DEFAULT_PAGE_SIZE
    };
    cards
        .into_iter()
        .take(cap)
        .filter(|card| !card.message.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: usize, message: &str) -> RawReview {
        RawReview {
            id: id.to_string(),
            name: format!("Author {id}"),
            date: "2024-02-01".to_string(),
            date_beauty: "1 февраля 2024".to_string(),
            message: message.to_string(),
            rating: "5".to_string(),
        }
    }

    #[test]
    fn default_fetch_caps_at_twenty_cards() {
        let cards: Vec<RawReview> = (0..25).map(|i| card(i, "fine doctor")).collect();

        let capped = collect_cards(cards.clone(), false);
        let all = collect_cards(cards, true);

        assert_eq!(capped.len(), 20);
        assert_eq!(all.len(), 25);
        // DOM order preserved
        assert_eq!(capped[0].id, "0");
        assert_eq!(capped[19].id, "19");
    }

    #[test]
    fn blank_messages_are_dropped() {
        let cards = vec![card(1, "good"), card(2, "   "), card(3, ""), card(4, "bad")];

        let kept = collect_cards(cards, true);

        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|c| !c.message.trim().is_empty()));
    }

    #[test]
    fn blank_card_inside_default_page_does_not_pull_in_extras() {
        let mut cards: Vec<RawReview> = (0..21).map(|i| card(i, "ok")).collect();
        cards[5].message = String::new();

        let kept = collect_cards(cards, false);

        // 20 slots considered, one blank among them
        assert_eq!(kept.len(), 19);
        assert!(!kept.iter().any(|c| c.id == "20"));
    }
}
