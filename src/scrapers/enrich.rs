//! Batch enrichment with per-listing failure isolation, plus the field parsers
//! shared by the source-specific enrichers.

use crate::error::{ExtractError, Result};
use crate::models::{DetailRecord, Details, Listings};
use crate::renderer::Renderer;
use crate::scrapers::traits::DetailEnricher;
use tracing::{debug, info, warn};

/// Enrich every listing of `listings`, in order.
///
/// A listing whose extraction fails is kept as a `Bare` record and the failure
/// is logged. Only programming errors (bad selectors) abort the batch.
pub fn enrich_batch(
    enricher: &dyn DetailEnricher,
    renderer: &mut dyn Renderer,
    listings: &Listings,
) -> Result<Details> {
    let mut details = Details::with_capacity(listings.len());

    for (id, url) in listings {
        let record = match enricher.extract(renderer, url) {
            Ok(record) => record,
            Err(ExtractError::Render(err)) if err.is_programming_error() => {
                return Err(err.into());
            }
            Err(err) => {
                warn!(%id, %url, kind = err.kind(), error = %err, "Detail extraction failed, keeping bare record");
                DetailRecord::bare(url.as_str())
            }
        };
        details.insert(id.clone(), record);
    }

    let bare = details.values().filter(|r| r.is_bare()).count();
    info!(total = details.len(), bare, "Enriched listings");
    Ok(details)
}

/// Enricher for sources without a structured details page
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlOnlyEnricher;

impl DetailEnricher for UrlOnlyEnricher {
    fn extract(&self, _renderer: &mut dyn Renderer, url: &str) -> std::result::Result<DetailRecord, ExtractError> {
        debug!(url, "No detail extraction for this source");
        Ok(DetailRecord::bare(url))
    }
}

/// Parse a non-negative integer such as `"350 000 €"` or `"1.250.000"`.
///
/// `unit` is stripped from the end first. Spaces (including non-breaking ones),
/// dots, commas and apostrophes are treated as thousands separators.
pub fn parse_integer(field: &'static str, raw: &str, unit: &str) -> std::result::Result<u64, ExtractError> {
    let trimmed = raw.trim();
    let without_unit = trimmed.strip_suffix(unit).unwrap_or(trimmed);

    let digits: String = without_unit
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '.' | ',' | '\''))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ExtractError::malformed(field, raw));
    }
    digits.parse().map_err(|_| ExtractError::malformed(field, raw))
}

/// Like [`parse_integer`] but for small counts and surfaces
pub fn parse_count(field: &'static str, raw: &str, unit: &str) -> std::result::Result<u32, ExtractError> {
    let value = parse_integer(field, raw, unit)?;
    u32::try_from(value).map_err(|_| ExtractError::malformed(field, raw))
}

/// First whitespace-separated token, e.g. `"3"` in `"3 bedrooms"`
pub fn first_token(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// Last whitespace-separated token, e.g. `"3"` in `"Bedrooms 3"`
pub fn last_token(text: &str) -> &str {
    text.split_whitespace().last().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::models::CompleteDetails;
    use crate::renderer::{FixtureSite, RendererLauncher};
    use rstest::rstest;

    #[rstest]
    #[case("350000€", "€", 350_000)]
    #[case("350 000 €", "€", 350_000)]
    #[case("1.250.000", "", 1_250_000)]
    #[case("1\u{a0}250\u{a0}000 €", "€", 1_250_000)]
    #[case(" 85 m²", "m²", 85)]
    #[case("0", "", 0)]
    fn parses_integers(#[case] raw: &str, #[case] unit: &str, #[case] expected: u64) {
        assert_eq!(parse_integer("price", raw, unit).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("Price on request")]
    #[case("-5")]
    #[case("12a")]
    #[case("€")]
    fn rejects_malformed_integers(#[case] raw: &str) {
        let err = parse_integer("price", raw, "€").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedField { field: "price", .. }));
    }

    #[test]
    fn count_overflow_is_malformed() {
        assert!(parse_count("bedrooms", "99999999999", "").is_err());
        assert_eq!(parse_count("bedrooms", "3", "").unwrap(), 3);
    }

    #[test]
    fn tokens() {
        assert_eq!(first_token("3 bedrooms"), "3");
        assert_eq!(last_token("Habitable area 120m²"), "120m²");
        assert_eq!(first_token("   "), "");
    }

    /// Completes every url except the ones listed as failing
    struct ScriptedEnricher {
        malformed: &'static str,
        unreachable: &'static str,
    }

    impl DetailEnricher for ScriptedEnricher {
        fn extract(&self, _renderer: &mut dyn Renderer, url: &str) -> std::result::Result<DetailRecord, ExtractError> {
            if url == self.malformed {
                return Err(ExtractError::malformed("price", "n/a"));
            }
            if url == self.unreachable {
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason: "timeout".to_string(),
                }
                .into());
            }
            Ok(DetailRecord::Complete(CompleteDetails::new(url, Some(100), None, None, Some(10))))
        }
    }

    #[test]
    fn failures_degrade_single_items() {
        let mut renderer = FixtureSite::new().launch().unwrap();
        let listings: Listings = [("1", "u1"), ("2", "u2"), ("3", "u3"), ("4", "u4")]
            .into_iter()
            .map(|(id, url)| (id.to_string(), url.to_string()))
            .collect();
        let enricher = ScriptedEnricher {
            malformed: "u2",
            unreachable: "u3",
        };

        let details = enrich_batch(&enricher, renderer.as_mut(), &listings).unwrap();

        assert_eq!(details.keys().collect::<Vec<_>>(), vec!["1", "2", "3", "4"]);
        assert_eq!(details["2"], DetailRecord::bare("u2"));
        assert_eq!(details["3"], DetailRecord::bare("u3"));
        assert!(!details["1"].is_bare());
        assert!(!details["4"].is_bare());
    }

    struct BrokenSelectorEnricher;

    impl DetailEnricher for BrokenSelectorEnricher {
        fn extract(&self, _renderer: &mut dyn Renderer, _url: &str) -> std::result::Result<DetailRecord, ExtractError> {
            Err(RenderError::InvalidSelector("div[".to_string()).into())
        }
    }

    #[test]
    fn programming_errors_abort_the_batch() {
        let mut renderer = FixtureSite::new().launch().unwrap();
        let listings: Listings = [("1".to_string(), "u1".to_string())].into_iter().collect();
        assert!(enrich_batch(&BrokenSelectorEnricher, renderer.as_mut(), &listings).is_err());
    }

    #[test]
    fn url_only_enricher_never_navigates() {
        let site = FixtureSite::new();
        let mut renderer = site.launch().unwrap();
        let record = UrlOnlyEnricher.extract(renderer.as_mut(), "https://immovlan.test/1").unwrap();
        assert_eq!(record, DetailRecord::bare("https://immovlan.test/1"));
        assert!(site.visits().is_empty());
    }
}
