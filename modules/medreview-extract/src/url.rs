use medreview_common::Platform;

/// Review-list sub-path on ProDoctorov. The bare doctor page shows only
/// the default first page of reviews.
const OTZIVI_SUFFIX: &str = "/otzivi";

/// Normalize a doctor-page URL for the target platform.
///
/// ProDoctorov URLs lose any trailing slash and, when the caller wants the
/// full review list, gain the `/otzivi` suffix if not already present.
/// SberZdorovie URLs pass through unchanged. Pure and idempotent;
/// malformed URLs are the navigation layer's problem.
pub fn normalize_url(url: &str, platform: Platform, all_reviews: bool) -> String {
    match platform {
        Platform::Prodoctorov => {
            let trimmed = url.trim_end_matches('/');
            if all_reviews && !trimmed.ends_with(OTZIVI_SUFFIX) {
                format!("{trimmed}{OTZIVI_SUFFIX}")
            } else {
                trimmed.to_string()
            }
        }
        Platform::Sberzdorovie => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prodoctorov_strips_trailing_slash() {
        let url = normalize_url(
            "https://prodoctorov.ru/moskva/vrach/12345-ivanov/",
            Platform::Prodoctorov,
            false,
        );
        assert_eq!(url, "https://prodoctorov.ru/moskva/vrach/12345-ivanov");
    }

    #[test]
    fn prodoctorov_appends_otzivi_only_for_all_reviews() {
        let base = "https://prodoctorov.ru/moskva/vrach/12345-ivanov";
        assert_eq!(
            normalize_url(base, Platform::Prodoctorov, true),
            format!("{base}/otzivi")
        );
        assert_eq!(normalize_url(base, Platform::Prodoctorov, false), base);
    }

    #[test]
    fn normalization_is_idempotent() {
        let base = "https://prodoctorov.ru/moskva/vrach/12345-ivanov/";
        let once = normalize_url(base, Platform::Prodoctorov, true);
        let twice = normalize_url(&once, Platform::Prodoctorov, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn sberzdorovie_passes_through() {
        let url = "https://docdoc.ru/doctor/Ivanov_Ivan/";
        assert_eq!(normalize_url(url, Platform::Sberzdorovie, true), url);
        assert_eq!(normalize_url(url, Platform::Sberzdorovie, false), url);
    }
}
