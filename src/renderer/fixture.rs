use super::{select_in, Node, Renderer, RendererLauncher};
use crate::error::RenderError;
use scraper::Html;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct SiteState {
    pages: HashMap<String, String>,
    visits: Vec<String>,
    launches: usize,
}

/// In-memory site serving captured HTML by url.
///
/// Clones share the same pages, so a site can be edited while renderers
/// launched from it are in use.
#[derive(Debug, Clone, Default)]
pub struct FixtureSite {
    state: Arc<Mutex<SiteState>>,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.set_page(url, html);
        self
    }

    pub fn set_page(&self, url: impl Into<String>, html: impl Into<String>) {
        self.lock().pages.insert(url.into(), html.into());
    }

    pub fn remove_page(&self, url: &str) {
        self.lock().pages.remove(url);
    }

    /// Every url navigated to so far, in order
    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    pub fn launches(&self) -> usize {
        self.lock().launches
    }

    fn lock(&self) -> MutexGuard<'_, SiteState> {
        // A panic while holding the lock cannot leave the maps half-written
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RendererLauncher for FixtureSite {
    fn launch(&self) -> Result<Box<dyn Renderer>, RenderError> {
        self.lock().launches += 1;
        Ok(Box::new(FixtureRenderer {
            site: self.clone(),
            current: None,
        }))
    }
}

/// Renderer over a [`FixtureSite`]; waits never block
pub struct FixtureRenderer {
    site: FixtureSite,
    current: Option<String>,
}

impl FixtureRenderer {
    fn document(&self) -> Result<Html, RenderError> {
        let html = self
            .current
            .as_deref()
            .ok_or_else(|| RenderError::Session("No page loaded".to_string()))?;
        Ok(Html::parse_document(html))
    }
}

impl Renderer for FixtureRenderer {
    fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let mut state = self.site.lock();
        state.visits.push(url.to_string());
        match state.pages.get(url) {
            Some(html) => {
                self.current = Some(html.clone());
                Ok(())
            }
            None => {
                self.current = None;
                Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason: "404 Not Found".to_string(),
                })
            }
        }
    }

    fn wait_for(&mut self, selector: &str, _timeout: Duration) -> Result<Option<Node>, RenderError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    fn query_all(&mut self, selector: &str) -> Result<Vec<Node>, RenderError> {
        select_in(&self.document()?, selector)
    }
}
