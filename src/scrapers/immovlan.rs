use crate::config::SourceConfig;
use crate::error::Result;
use crate::models::{ListingRef, Listings};
use crate::renderer::{Node, Renderer};
use crate::scrapers::scan::{first_link, scan_page, ResultPage};
use crate::scrapers::traits::SourceAdapter;
use std::time::Duration;
use tracing::info;

const RESULTS: &str = "article.list-view-item";
const FAVORITE_BUTTON: &str = "button.btn-favorite";

/// Immovlan search result scanner.
///
/// Listings are paired with [`UrlOnlyEnricher`](crate::scrapers::enrich::UrlOnlyEnricher):
/// the site has no stable details layout to extract from.
pub struct ImmovlanAdapter {
    search_url: String,
    max_pages: u32,
    wait: Duration,
}

impl ImmovlanAdapter {
    pub fn new(config: &SourceConfig, wait: Duration) -> Self {
        let search_url = format!("{}{}", config.search_url, config.search.to_query());
        info!(url = %search_url, "Immovlan search");

        Self {
            search_url,
            max_pages: config.max_pages,
            wait,
        }
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}&noindex={}", self.search_url, page)
    }
}

/// The listing id is only exposed on the result's favourite button
fn listing_from(node: &Node) -> Option<ListingRef> {
    let button = node.select_first(FAVORITE_BUTTON).ok().flatten()?;
    let id = button.attribute("data-value-id")?;
    if id.is_empty() {
        return None;
    }
    Some(ListingRef::new(id, first_link(node)?))
}

impl SourceAdapter for ImmovlanAdapter {
    fn search_all(&self, renderer: &mut dyn Renderer) -> Result<Listings> {
        let mut listings = Listings::new();

        for page in 1..=self.max_pages {
            let url = self.page_url(page);
            // Results are lazily loaded
            let result_page = ResultPage {
                url: &url,
                results: RESULTS,
                wait: Some(self.wait),
            };
            listings.extend(scan_page(renderer, &result_page, listing_from)?);
        }

        Ok(listings)
    }

    fn source_name(&self) -> &'static str {
        "immovlan"
    }
}
