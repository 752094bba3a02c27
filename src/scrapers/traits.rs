use crate::error::{ExtractError, Result};
use crate::models::{DetailRecord, Listings};
use crate::renderer::Renderer;

/// Lists the currently available listings of one source.
/// New sources (Zimmo, Logic-Immo, ...) plug in by implementing this and [`DetailEnricher`].
pub trait SourceAdapter: Send {
    /// Scan the configured result pages and return id -> url in page order.
    ///
    /// A page without results contributes nothing; only programming errors and
    /// dead renderer sessions are returned as errors.
    fn search_all(&self, renderer: &mut dyn Renderer) -> Result<Listings>;

    /// Name of the source, used in logs
    fn source_name(&self) -> &'static str;
}

/// Extracts structured details from one listing page
pub trait DetailEnricher: Send {
    /// Navigate to `url` and extract a record.
    ///
    /// A page without a details container yields `Ok(DetailRecord::Bare)`.
    fn extract(&self, renderer: &mut dyn Renderer, url: &str) -> std::result::Result<DetailRecord, ExtractError>;
}
