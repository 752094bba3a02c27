use crate::config::SourceConfig;
use crate::error::{ExtractError, Result};
use crate::models::{CompleteDetails, DetailRecord, ListingRef, Listings};
use crate::renderer::{Node, Renderer};
use crate::scrapers::enrich::{last_token, parse_count, parse_integer};
use crate::scrapers::scan::{collect_listings, skip_page};
use crate::scrapers::traits::{DetailEnricher, SourceAdapter};
use crate::scrapers::types::param_value;
use std::time::Duration;
use tracing::{debug, info, warn};

const REALO_ROOT: &str = "https://www.realo.be";
const LISTING_MODULE: &str = "div.module-listings";
const RESULTS: &str = r#"div.module-listings div[data-scope="componentEstateGridItem"]"#;
const DETAILS: &str = "div.property__container";
const ADDRESS: &str = "h1.address";
const PRICE: &str = r#"span[itemprop="price"]"#;
const FEATURES: &str = "div.component-property-features";

/// Postal codes configured under `realo.search.postalCodes`
pub fn postal_codes(config: &SourceConfig) -> Vec<String> {
    match config.search.get("postalCodes") {
        Some(toml::Value::Array(codes)) => codes.iter().map(param_value).collect(),
        Some(other) => vec![param_value(other)],
        None => Vec::new(),
    }
}

/// Realo only searches one location at a time, so there is one adapter per
/// postal code.
pub struct RealoAdapter {
    postal_code: String,
    search_url: String,
    wait: Duration,
}

impl RealoAdapter {
    pub fn new(config: &SourceConfig, postal_code: &str, wait: Duration) -> Self {
        let mut params = config.search.clone();
        params.remove("postalCodes");

        let search_url = format!("{}{}?{}", config.search_url, postal_code, params.to_query());
        info!(url = %search_url, postal_code, "Realo search");

        Self {
            postal_code: postal_code.to_string(),
            search_url,
            wait,
        }
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }
}

/// Result links are relative to the site root
fn listing_from(node: &Node) -> Option<ListingRef> {
    let id = node.attribute("id").filter(|id| !id.is_empty())?;
    let href = node.attribute("data-href")?;
    Some(ListingRef::new(id, format!("{}{}", REALO_ROOT, href)))
}

impl SourceAdapter for RealoAdapter {
    fn search_all(&self, renderer: &mut dyn Renderer) -> Result<Listings> {
        if let Err(err) = renderer.navigate(&self.search_url) {
            return skip_page(&self.search_url, err);
        }

        // Realo is slow: wait for the listing module, then stop it from loading forever
        if renderer.wait_for(LISTING_MODULE, self.wait)?.is_none() {
            warn!(url = %self.search_url, selector = LISTING_MODULE, "No listing module found on page");
            return Ok(Listings::new());
        }
        renderer.stop_loading()?;

        let nodes = renderer.query_all(RESULTS)?;
        Ok(collect_listings(&self.search_url, RESULTS, &nodes, listing_from))
    }

    fn source_name(&self) -> &'static str {
        "realo"
    }
}

/// Reads the property container of a Realo listing
pub struct RealoEnricher {
    wait: Duration,
}

impl RealoEnricher {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }
}

impl DetailEnricher for RealoEnricher {
    fn extract(&self, renderer: &mut dyn Renderer, url: &str) -> std::result::Result<DetailRecord, ExtractError> {
        renderer.navigate(url)?;

        let Some(container) = renderer.wait_for(DETAILS, self.wait)? else {
            warn!(url, "Can't find Realo formatted details");
            return Ok(DetailRecord::bare(url));
        };
        debug!(url, "Found Realo details");

        let address = container
            .select_first(ADDRESS)?
            .map(|node| node.text().trim().to_string())
            .filter(|address| !address.is_empty());

        let price = container
            .select_first(PRICE)?
            .map(|node| parse_integer("price", node.text(), "€"))
            .transpose()?;

        let features: Vec<String> = container
            .select_first(FEATURES)?
            .map(|node| node.lines().map(str::to_string).collect())
            .unwrap_or_default();

        let bedrooms = feature_value(&features, "Bedrooms")
            .map(|value| parse_count("bedrooms", value, ""))
            .transpose()?;
        let area = feature_value(&features, "Habitable area")
            .map(|value| parse_count("area", value, "m²"))
            .transpose()?;

        Ok(DetailRecord::Complete(CompleteDetails::new(
            url, price, address, bedrooms, area,
        )))
    }
}

/// Value at the end of the first feature line starting with `label`
fn feature_value<'a>(features: &'a [String], label: &str) -> Option<&'a str> {
    features
        .iter()
        .find(|line| line.starts_with(label))
        .map(|line| last_token(line))
}
