use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing identifier, unique only within one source's namespace
pub type ListingId = String;

/// Listings as returned by a scan: id -> url, in the order the source reported them
pub type Listings = IndexMap<ListingId, String>;

/// Enriched listings: id -> detail record, one entry per scanned listing
pub type Details = IndexMap<ListingId, DetailRecord>;

/// A single (id, url) pair found on a result page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRef {
    pub id: ListingId,
    pub url: String,
}

impl ListingRef {
    pub fn new(id: impl Into<ListingId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Detail record for one listing.
///
/// `Bare` is the degraded form: it only carries the url and is used whenever
/// structured extraction finds nothing or fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailRecord {
    Bare { url: String },
    Complete(CompleteDetails),
}

impl DetailRecord {
    pub fn bare(url: impl Into<String>) -> Self {
        DetailRecord::Bare { url: url.into() }
    }

    pub fn url(&self) -> &str {
        match self {
            DetailRecord::Bare { url } => url,
            DetailRecord::Complete(details) => &details.url,
        }
    }

    pub fn is_bare(&self) -> bool {
        matches!(self, DetailRecord::Bare { .. })
    }
}

/// Structured details extracted from a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteDetails {
    pub url: String,
    pub price: Option<u64>,
    pub address: Option<String>,
    pub bedrooms: Option<u32>,
    pub area: Option<u32>,
    /// Derived from `price / area`, `-1.0` when either is unknown
    pub price_per_sqm: f64,
}

impl CompleteDetails {
    pub fn new(
        url: impl Into<String>,
        price: Option<u64>,
        address: Option<String>,
        bedrooms: Option<u32>,
        area: Option<u32>,
    ) -> Self {
        Self {
            url: url.into(),
            price,
            address,
            bedrooms,
            area,
            price_per_sqm: price_per_sqm(price, area),
        }
    }
}

/// Price per square meter, or `-1.0` when it cannot be computed.
///
/// A zero area counts as unknown.
pub fn price_per_sqm(price: Option<u64>, area: Option<u32>) -> f64 {
    match (price, area) {
        (Some(price), Some(area)) if area > 0 => price as f64 / area as f64,
        _ => -1.0,
    }
}

impl fmt::Display for DetailRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailRecord::Bare { url } => write!(f, "{}", url),
            DetailRecord::Complete(details) => write!(f, "{}", details),
        }
    }
}

impl fmt::Display for CompleteDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_unknown<T: fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        }

        writeln!(f, "Address: {}", or_unknown(&self.address))?;
        writeln!(f, "Price: {}€", or_unknown(&self.price))?;
        writeln!(f, "Bedrooms: {}", or_unknown(&self.bedrooms))?;
        writeln!(f, "Area: {} m²", or_unknown(&self.area))?;
        if self.price_per_sqm >= 0.0 {
            writeln!(f, "Price per m²: {:.0}€", self.price_per_sqm)?;
        }
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_per_sqm_divides_when_both_known() {
        assert_eq!(price_per_sqm(Some(300_000), Some(100)), 3000.0);
        assert_eq!(price_per_sqm(Some(1), Some(3)), 1.0 / 3.0);
    }

    #[test]
    fn price_per_sqm_sentinel_when_missing() {
        assert_eq!(price_per_sqm(None, Some(100)), -1.0);
        assert_eq!(price_per_sqm(Some(300_000), None), -1.0);
        assert_eq!(price_per_sqm(None, None), -1.0);
        assert_eq!(price_per_sqm(Some(300_000), Some(0)), -1.0);
    }

    #[test]
    fn complete_details_derive_price_per_sqm() {
        let details = CompleteDetails::new("u", Some(250_000), None, Some(2), Some(50));
        assert_eq!(details.price_per_sqm, 5000.0);
    }

    #[test]
    fn every_record_keeps_its_url() {
        assert_eq!(DetailRecord::bare("u1").url(), "u1");
        let complete = DetailRecord::Complete(CompleteDetails::new("u2", None, None, None, None));
        assert_eq!(complete.url(), "u2");
        assert!(!complete.is_bare());
    }

    #[test]
    fn display_lists_known_fields_and_url() {
        let details = CompleteDetails::new(
            "https://example.test/1",
            Some(200_000),
            Some("Rue Haute 1, 1000 Brussels".to_string()),
            None,
            Some(80),
        );
        let text = DetailRecord::Complete(details).to_string();
        assert!(text.contains("Address: Rue Haute 1, 1000 Brussels"));
        assert!(text.contains("Bedrooms: unknown"));
        assert!(text.contains("Price per m²: 2500€"));
        assert!(text.ends_with("https://example.test/1"));
    }
}
