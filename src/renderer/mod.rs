//! Page rendering capability consumed by source adapters and detail enrichers.
//!
//! Renderers hand out owned [`Node`] snapshots of the current page, so callers
//! never hold on to browser handles while extracting fields.

pub mod chrome;
pub mod fixture;

pub use chrome::{ChromeLauncher, ChromeRenderer};
pub use fixture::{FixtureRenderer, FixtureSite};

use crate::error::RenderError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::time::Duration;

/// Browser-like page access used by the scrapers
pub trait Renderer {
    /// Load `url`, replacing the current page
    fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Wait up to `timeout` for `selector` to match. A timeout is `Ok(None)`.
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<Option<Node>, RenderError>;

    /// All elements of the current page matching `selector`, in document order
    fn query_all(&mut self, selector: &str) -> Result<Vec<Node>, RenderError>;

    /// Stop any loading still in progress on the current page
    fn stop_loading(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Acquires a fresh renderer session
pub trait RendererLauncher: Send + Sync {
    fn launch(&self) -> Result<Box<dyn Renderer>, RenderError>;
}

/// Owned snapshot of one element
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    html: String,
    text: String,
    attributes: HashMap<String, String>,
}

impl Node {
    pub fn from_element(element: ElementRef<'_>) -> Self {
        let attributes = element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Self {
            html: element.html(),
            text: inner_text(element),
            attributes,
        }
    }

    /// Rendered text: one line per block, whitespace collapsed
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Descendants of this node matching `selector`
    pub fn select(&self, selector: &str) -> Result<Vec<Node>, RenderError> {
        let fragment = Html::parse_fragment(&self.html);
        select_in(&fragment, selector)
    }

    pub fn select_first(&self, selector: &str) -> Result<Option<Node>, RenderError> {
        Ok(self.select(selector)?.into_iter().next())
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector, RenderError> {
    Selector::parse(selector).map_err(|_| RenderError::InvalidSelector(selector.to_string()))
}

/// Snapshot every element of `document` matching `selector`
pub fn select_in(document: &Html, selector: &str) -> Result<Vec<Node>, RenderError> {
    let parsed = parse_selector(selector)?;
    Ok(document.select(&parsed).map(Node::from_element).collect())
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "section", "table", "tr",
    "ul",
];

/// Cells stay on their row's line but never run into their neighbours
const CELL_TAGS: &[&str] = &["td", "th"];

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

fn inner_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(element, &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }

    let block = BLOCK_TAGS.contains(&name);
    let cell = CELL_TAGS.contains(&name);
    if block {
        out.push('\n');
    } else if cell {
        out.push(' ');
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            // Source newlines inside inline content are just whitespace
            out.push_str(&text.replace('\n', " "));
        } else if let Some(child_element) = ElementRef::wrap(child) {
            push_text(child_element, out);
        }
    }
    if block {
        out.push('\n');
    } else if cell {
        out.push(' ');
    }
}
