use crate::error::{RenderError, Result};
use crate::models::{ListingRef, Listings};
use crate::renderer::{Node, Renderer};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How to find listings on one result page
pub struct ResultPage<'a> {
    pub url: &'a str,
    pub results: &'a str,
    /// Wait this long for lazily loaded results before querying
    pub wait: Option<Duration>,
}

/// Navigate to a result page and collect every listing `extract` recognises.
///
/// Navigation failures and pages without results contribute nothing.
pub fn scan_page<F>(renderer: &mut dyn Renderer, page: &ResultPage<'_>, extract: F) -> Result<Listings>
where
    F: Fn(&Node) -> Option<ListingRef>,
{
    if let Err(err) = renderer.navigate(page.url) {
        return skip_page(page.url, err);
    }

    if let Some(timeout) = page.wait {
        if renderer.wait_for(page.results, timeout)?.is_none() {
            warn!(url = page.url, selector = page.results, "No results found on page");
            return Ok(Listings::new());
        }
    }

    let nodes = renderer.query_all(page.results)?;
    Ok(collect_listings(page.url, page.results, &nodes, extract))
}

/// Turn result nodes into listings, skipping the ones without id or link
pub fn collect_listings<F>(page_url: &str, selector: &str, nodes: &[Node], extract: F) -> Listings
where
    F: Fn(&Node) -> Option<ListingRef>,
{
    if nodes.is_empty() {
        warn!(url = page_url, selector, "No results found on page");
        return Listings::new();
    }

    let mut listings = Listings::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        match extract(node) {
            Some(listing) => {
                listings.insert(listing.id, listing.url);
            }
            None => debug!(url = page_url, idx, "Skipped result without id or link"),
        }
    }

    info!(url = page_url, found = listings.len(), "Scanned result page");
    listings
}

/// Log a failed navigation and contribute nothing, unless the session itself is gone
pub fn skip_page(url: &str, err: RenderError) -> Result<Listings> {
    match err {
        RenderError::Navigation { .. } => {
            warn!(url, error = %err, "Could not load result page");
            Ok(Listings::new())
        }
        other => Err(other.into()),
    }
}

/// `href` of the first link inside `node`
pub fn first_link(node: &Node) -> Option<String> {
    node.select_first("a[href]")
        .ok()
        .flatten()
        .and_then(|link| link.attribute("href").map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{FixtureSite, RendererLauncher};

    const PAGE: &str = r#"
        <ul>
          <li data-id="a"><a href="/a">A</a></li>
          <li><a href="/anon">no id</a></li>
          <li data-id="b"><a href="/b">B</a></li>
        </ul>"#;

    fn by_data_id(node: &Node) -> Option<ListingRef> {
        Some(ListingRef::new(node.attribute("data-id")?, first_link(node)?))
    }

    #[test]
    fn collects_in_page_order() {
        let site = FixtureSite::new().with_page("https://s.test/1", PAGE);
        let mut renderer = site.launch().unwrap();
        let page = ResultPage {
            url: "https://s.test/1",
            results: "li",
            wait: None,
        };

        let listings = scan_page(renderer.as_mut(), &page, by_data_id).unwrap();
        let pairs: Vec<_> = listings.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, vec![("a", "/a"), ("b", "/b")]);
    }

    #[test]
    fn unreachable_or_empty_pages_contribute_nothing() {
        let site = FixtureSite::new().with_page("https://s.test/empty", "<p>No results</p>");
        let mut renderer = site.launch().unwrap();

        for url in ["https://s.test/empty", "https://s.test/missing"] {
            let page = ResultPage {
                url,
                results: "li",
                wait: Some(Duration::from_secs(1)),
            };
            assert!(scan_page(renderer.as_mut(), &page, by_data_id).unwrap().is_empty());
        }
    }

    #[test]
    fn invalid_selector_fails_loudly() {
        let site = FixtureSite::new().with_page("https://s.test/1", PAGE);
        let mut renderer = site.launch().unwrap();
        let page = ResultPage {
            url: "https://s.test/1",
            results: "li[",
            wait: None,
        };
        assert!(scan_page(renderer.as_mut(), &page, by_data_id).is_err());
    }
}
