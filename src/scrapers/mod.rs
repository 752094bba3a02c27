pub mod enrich;
pub mod immovlan;
pub mod immoweb;
pub mod realo;
pub mod scan;
pub mod traits;
pub mod types;

pub use enrich::{enrich_batch, UrlOnlyEnricher};
pub use immovlan::ImmovlanAdapter;
pub use immoweb::{ImmowebAdapter, ImmowebEnricher};
pub use realo::{RealoAdapter, RealoEnricher};
pub use traits::{DetailEnricher, SourceAdapter};

use crate::config::AppConfig;
use crate::discovery::DiscoveryEngine;
use crate::fanout::FanOut;
use crate::renderer::RendererLauncher;
use crate::store::KvBackend;
use std::sync::Arc;
use tracing::info;

/// Build every enabled source from `config`, grouped under one [`FanOut`] named `all`
pub fn build_sources(
    config: &AppConfig,
    backend: Arc<dyn KvBackend>,
    launcher: Arc<dyn RendererLauncher>,
) -> FanOut {
    let wait = config.general.wait_timeout();
    let mut all = FanOut::new("all");

    if let Some(source) = config.immoweb.as_ref().filter(|s| s.enabled) {
        let engine = DiscoveryEngine::new(
            "immoweb",
            Box::new(ImmowebAdapter::new(source)),
            Box::new(ImmowebEnricher::new(wait)),
            backend.clone(),
            launcher.clone(),
        )
        .with_test_send(source.test_send(&config.bot));
        all.push(Box::new(engine));
    }

    if let Some(source) = config.immovlan.as_ref().filter(|s| s.enabled) {
        let engine = DiscoveryEngine::new(
            "immovlan",
            Box::new(ImmovlanAdapter::new(source, wait)),
            Box::new(UrlOnlyEnricher),
            backend.clone(),
            launcher.clone(),
        )
        .with_test_send(source.test_send(&config.bot));
        all.push(Box::new(engine));
    }

    if let Some(source) = config.realo.as_ref().filter(|s| s.enabled) {
        let mut group = FanOut::new("realo");
        for postal_code in realo::postal_codes(source) {
            let engine = DiscoveryEngine::new(
                format!("realo{}", postal_code),
                Box::new(RealoAdapter::new(source, &postal_code, wait)),
                Box::new(RealoEnricher::new(wait)),
                backend.clone(),
                launcher.clone(),
            )
            .with_test_send(source.test_send(&config.bot));
            group.push(Box::new(engine));
        }
        all.push(Box::new(group));
    }

    info!(sources = ?all.child_names(), "Configured sources");
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use crate::renderer::FixtureSite;
    use crate::store::MemoryBackend;

    #[test]
    fn builds_enabled_sources_in_order() {
        let config = AppConfig::parse(
            r#"
            [general]
            store_dir = "state"

            [immoweb]
            search_url = "https://www.immoweb.be/en/search/house/for-sale?"

            [immovlan]
            enabled = false
            search_url = "https://immovlan.be/en/real-estate?"

            [realo]
            search_url = "https://www.realo.be/en/search/house/for-sale/"

            [realo.search]
            postalCodes = [1050, 1060]
            "#,
        )
        .unwrap();

        let sources = build_sources(&config, Arc::new(MemoryBackend::new()), Arc::new(FixtureSite::new()));
        assert_eq!(sources.name(), "all");
        assert_eq!(sources.child_names(), vec!["immoweb", "realo"]);
    }
}
