use super::{parse_selector, select_in, Node, Renderer, RendererLauncher};
use crate::config::GeneralConfig;
use crate::error::RenderError;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::Html;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Launches headless Chrome sessions
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    headless: bool,
    chrome_path: Option<PathBuf>,
    page_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(headless: bool, chrome_path: Option<PathBuf>, page_timeout: Duration) -> Self {
        Self {
            headless,
            chrome_path,
            page_timeout,
        }
    }

    pub fn from_config(general: &GeneralConfig) -> Self {
        Self::new(
            general.headless,
            general.chrome_path.clone(),
            // Page loads get more slack than element waits
            general.wait_timeout() * 6,
        )
    }
}

impl RendererLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Box<dyn Renderer>, RenderError> {
        info!("Launching headless Chrome...");

        let mut options = LaunchOptions::default_builder()
            .headless(self.headless)
            .build()
            .map_err(|e| RenderError::Session(format!("Failed to build launch options: {}", e)))?;

        if let Some(path) = &self.chrome_path {
            options.path = Some(path.clone());
        }

        let browser = Browser::new(options)
            .map_err(|e| RenderError::Session(format!("Failed to launch Chrome browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| RenderError::Session(format!("Failed to open tab: {}", e)))?;
        tab.set_default_timeout(self.page_timeout);

        Ok(Box::new(ChromeRenderer {
            _browser: browser,
            tab,
        }))
    }
}

/// Renderer backed by one headless Chrome tab.
///
/// Dropping it shuts the browser down.
pub struct ChromeRenderer {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeRenderer {
    fn snapshot(&self) -> Result<Html, RenderError> {
        let content = self
            .tab
            .get_content()
            .map_err(|e| RenderError::Session(format!("Failed to read page content: {}", e)))?;
        Ok(Html::parse_document(&content))
    }
}

impl Renderer for ChromeRenderer {
    fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        debug!(url, "Navigating");
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<Option<Node>, RenderError> {
        parse_selector(selector)?;

        if let Err(e) = self.tab.wait_for_element_with_custom_timeout(selector, timeout) {
            debug!(selector, error = %e, "Element did not appear in time");
            return Ok(None);
        }

        let document = self.snapshot()?;
        Ok(select_in(&document, selector)?.into_iter().next())
    }

    fn query_all(&mut self, selector: &str) -> Result<Vec<Node>, RenderError> {
        let document = self.snapshot()?;
        select_in(&document, selector)
    }

    fn stop_loading(&mut self) -> Result<(), RenderError> {
        self.tab
            .evaluate("window.stop();", false)
            .map_err(|e| RenderError::Session(format!("Failed to stop page load: {}", e)))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RenderError> {
        if let Err(e) = self.tab.close(true) {
            warn!(error = %e, "Failed to close Chrome tab");
            return Err(RenderError::Session(e.to_string()));
        }
        Ok(())
    }
}
