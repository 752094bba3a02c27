//! Incremental discovery: scan a source, diff against what was seen before,
//! enrich what is new.

use crate::error::{Result, ScoutError};
use crate::models::{Details, ListingId, Listings};
use crate::renderer::{Renderer, RendererLauncher};
use crate::scrapers::enrich::enrich_batch;
use crate::scrapers::traits::{DetailEnricher, SourceAdapter};
use crate::store::{KvBackend, SeenStore};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Contract shared by single sources and groups of sources
pub trait Discovery {
    fn name(&self) -> &str;

    /// Acquire the renderer session and seen store
    fn open(&mut self) -> Result<()>;

    /// Release everything acquired by `open`, even after earlier failures
    fn close(&mut self) -> Result<()>;

    /// Every listing currently reported upstream
    fn search_all(&mut self) -> Result<Listings>;

    /// Listings not seen before, enriched. Marks them as seen.
    fn search_new(&mut self) -> Result<Details>;

    /// Make `ids` count as unseen again
    fn forget(&mut self, ids: &[ListingId]) -> Result<()>;
}

impl<D: Discovery + ?Sized> Discovery for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn search_all(&mut self) -> Result<Listings> {
        (**self).search_all()
    }

    fn search_new(&mut self) -> Result<Details> {
        (**self).search_new()
    }

    fn forget(&mut self, ids: &[ListingId]) -> Result<()> {
        (**self).forget(ids)
    }
}

/// An opened [`Discovery`], closed again when dropped.
///
/// Call [`Session::close`] to observe release errors; on drop they are only
/// logged.
pub struct Session<'a> {
    inner: &'a mut dyn Discovery,
    closed: bool,
}

impl<'a> Session<'a> {
    pub fn open(inner: &'a mut dyn Discovery) -> Result<Self> {
        inner.open()?;
        Ok(Self {
            inner,
            closed: false,
        })
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.inner.close()
    }
}

impl<'a> Deref for Session<'a> {
    type Target = dyn Discovery + 'a;

    fn deref(&self) -> &Self::Target {
        self.inner
    }
}

impl<'a> DerefMut for Session<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.inner.close() {
            warn!(source = self.inner.name(), error = %e, "Failed to release source");
        }
    }
}

struct OpenSource {
    renderer: Box<dyn Renderer>,
    store: SeenStore,
}

/// One source: adapter + seen store + enricher
pub struct DiscoveryEngine {
    name: String,
    adapter: Box<dyn SourceAdapter>,
    enricher: Box<dyn DetailEnricher>,
    backend: Arc<dyn KvBackend>,
    launcher: Arc<dyn RendererLauncher>,
    test_send: bool,
    last_scan: Listings,
    open: Option<OpenSource>,
}

impl DiscoveryEngine {
    /// `name` is also the seen store namespace
    pub fn new(
        name: impl Into<String>,
        adapter: Box<dyn SourceAdapter>,
        enricher: Box<dyn DetailEnricher>,
        backend: Arc<dyn KvBackend>,
        launcher: Arc<dyn RendererLauncher>,
    ) -> Self {
        Self {
            name: name.into(),
            adapter,
            enricher,
            backend,
            launcher,
            test_send: false,
            last_scan: Listings::new(),
            open: None,
        }
    }

    /// When nothing is new, re-send one known listing to exercise notifications
    pub fn with_test_send(mut self, enabled: bool) -> Self {
        self.test_send = enabled;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Currently persisted seen ids, if open
    pub fn seen(&self) -> Option<&Listings> {
        self.open.as_ref().map(|open| open.store.get_all())
    }

    fn opened(&mut self) -> Result<&mut OpenSource> {
        let name = &self.name;
        self.open
            .as_mut()
            .ok_or_else(|| ScoutError::NotOpen(name.clone()))
    }

    fn scan(&mut self) -> Result<Listings> {
        let adapter = &self.adapter;
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| ScoutError::NotOpen(self.name.clone()))?;

        let all = adapter.search_all(open.renderer.as_mut())?;
        info!(found = all.len(), "Scanned {}", adapter.source_name());
        if !all.is_empty() {
            self.last_scan = all.clone();
        }
        Ok(all)
    }
}

/// One already-known listing to re-send: the first of this scan, else of the
/// last non-empty scan, else the oldest seen entry.
fn test_send_candidate(all: &Listings, last_scan: &Listings, store: &SeenStore) -> Option<(ListingId, String)> {
    [all, last_scan, store.get_all()]
        .into_iter()
        .find_map(|listings| listings.first())
        .map(|(id, url)| (id.clone(), url.clone()))
}

impl Discovery for DiscoveryEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<()> {
        let _span = info_span!("source", name = %self.name).entered();
        if self.open.is_some() {
            debug!("Already open");
            return Ok(());
        }

        let store = SeenStore::open(self.backend.as_ref(), &self.name)?;
        let renderer = match self.launcher.launch() {
            Ok(renderer) => renderer,
            Err(e) => {
                if let Err(close_err) = store.close() {
                    warn!(error = %close_err, "Failed to close seen store after launch failure");
                }
                return Err(ScoutError::Launch(e.to_string()));
            }
        };

        info!(seen = store.len(), "Opened source");
        self.open = Some(OpenSource { renderer, store });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let _span = info_span!("source", name = %self.name).entered();
        let Some(OpenSource { mut renderer, store }) = self.open.take() else {
            return Ok(());
        };

        let rendered = renderer.close();
        drop(renderer);
        let stored = store.close();
        debug!("Closed source");

        rendered?;
        stored?;
        Ok(())
    }

    fn search_all(&mut self) -> Result<Listings> {
        let _span = info_span!("source", name = %self.name).entered();
        self.scan()
    }

    fn search_new(&mut self) -> Result<Details> {
        let _span = info_span!("source", name = %self.name).entered();
        let all = self.scan()?;

        let Self {
            name,
            enricher,
            test_send,
            last_scan,
            open,
            ..
        } = self;
        let open = open.as_mut().ok_or_else(|| ScoutError::NotOpen(name.clone()))?;

        let new: Listings = all
            .iter()
            .filter(|(id, _)| !open.store.contains(id))
            .map(|(id, url)| (id.clone(), url.clone()))
            .collect();

        if !new.is_empty() {
            info!(count = new.len(), ids = ?new.keys().collect::<Vec<_>>(), "Found new listings");
            open.store.merge(&new)?;
            return match enrich_batch(enricher.as_ref(), open.renderer.as_mut(), &new) {
                Ok(details) => Ok(details),
                Err(e) => {
                    // Not handed out, so they must stay unseen
                    let ids: Vec<ListingId> = new.keys().cloned().collect();
                    if let Err(forget_err) = open.store.forget(&ids) {
                        warn!(error = %forget_err, "Failed to un-mark listings after enrichment failure");
                    }
                    Err(e)
                }
            };
        }

        info!("No new listings");
        if !*test_send {
            return Ok(Details::new());
        }

        // Already known, so the store is left untouched
        let Some((id, url)) = test_send_candidate(&all, last_scan, &open.store) else {
            debug!("Nothing known yet to test-send");
            return Ok(Details::new());
        };
        info!(%id, "Test-sending an already known listing");
        let single: Listings = [(id, url)].into_iter().collect();
        enrich_batch(enricher.as_ref(), open.renderer.as_mut(), &single)
    }

    fn forget(&mut self, ids: &[ListingId]) -> Result<()> {
        let _span = info_span!("source", name = %self.name).entered();
        let open = self.opened()?;
        let removed = open.store.forget(ids)?;
        info!(requested = ids.len(), removed, "Forgot listings");
        Ok(())
    }
}
