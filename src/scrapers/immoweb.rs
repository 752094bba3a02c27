use crate::config::SourceConfig;
use crate::error::{ExtractError, Result};
use crate::models::{CompleteDetails, DetailRecord, ListingRef, Listings};
use crate::renderer::{Node, Renderer};
use crate::scrapers::enrich::{first_token, parse_count, parse_integer};
use crate::scrapers::scan::{first_link, scan_page, ResultPage};
use crate::scrapers::traits::{DetailEnricher, SourceAdapter};
use std::time::Duration;
use tracing::{debug, info, warn};

const RESULTS: &str = r#"article[id^="classified_"]"#;
const ID_PREFIX: &str = "classified_";
const DETAILS: &str = "div.classified__header-content";

/// Immoweb search result scanner
pub struct ImmowebAdapter {
    search_url: String,
    max_pages: u32,
}

impl ImmowebAdapter {
    pub fn new(config: &SourceConfig) -> Self {
        let mut params = config.search.clone();
        // Without an explicit order the site may list old properties first
        if !params.contains("orderBy") {
            params.set("orderBy", "newest");
        }

        let search_url = format!("{}{}", config.search_url, params.to_query());
        info!(url = %search_url, "Immoweb search");

        Self {
            search_url,
            max_pages: config.max_pages,
        }
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}&page={}", self.search_url, page)
    }
}

/// Result ids look like `classified_10123456`; only the number is kept
fn listing_from(node: &Node) -> Option<ListingRef> {
    let id = node.attribute("id")?.strip_prefix(ID_PREFIX)?;
    if id.is_empty() {
        return None;
    }
    Some(ListingRef::new(id, first_link(node)?))
}

impl SourceAdapter for ImmowebAdapter {
    fn search_all(&self, renderer: &mut dyn Renderer) -> Result<Listings> {
        let mut listings = Listings::new();

        for page in 1..=self.max_pages {
            let url = self.page_url(page);
            let result_page = ResultPage {
                url: &url,
                results: RESULTS,
                wait: None,
            };
            listings.extend(scan_page(renderer, &result_page, listing_from)?);
        }

        Ok(listings)
    }

    fn source_name(&self) -> &'static str {
        "immoweb"
    }
}

/// Reads the classified header of an Immoweb listing
pub struct ImmowebEnricher {
    wait: Duration,
}

impl ImmowebEnricher {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }
}

impl DetailEnricher for ImmowebEnricher {
    fn extract(&self, renderer: &mut dyn Renderer, url: &str) -> std::result::Result<DetailRecord, ExtractError> {
        renderer.navigate(url)?;

        let Some(header) = renderer.wait_for(DETAILS, self.wait)? else {
            warn!(url, "Can't find Immoweb formatted details");
            return Ok(DetailRecord::bare(url));
        };

        debug!(url, "Found Immoweb details");
        parse_header(url, &header)
    }
}

/// The header is a short list of lines: title, `3 bedrooms | 120 m²`,
/// `350000€`, address, and a call to action, in that order.
fn parse_header(url: &str, header: &Node) -> std::result::Result<DetailRecord, ExtractError> {
    let lines: Vec<&str> = header.lines().collect();

    let address = lines
        .len()
        .checked_sub(2)
        .map(|idx| lines[idx].replace("Ask for the exact address", "No exact address"));

    let price = lines
        .iter()
        .find(|line| line.ends_with('€'))
        .map(|line| parse_integer("price", line, "€"))
        .transpose()?;

    let (bedrooms, area) = match lines.iter().find(|line| line.ends_with("m²")) {
        Some(line) => {
            let (bedrooms, area) = line
                .split_once('|')
                .ok_or_else(|| ExtractError::malformed("bedrooms_area", *line))?;
            (
                Some(parse_count("bedrooms", first_token(bedrooms), "")?),
                Some(parse_count("area", first_token(area), "m²")?),
            )
        }
        None => (None, None),
    };

    Ok(DetailRecord::Complete(CompleteDetails::new(
        url, price, address, bedrooms, area,
    )))
}
