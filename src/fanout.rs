//! Several sources presented as one.

use crate::discovery::Discovery;
use crate::error::{Result, ScoutError};
use crate::models::{Details, ListingId, Listings};
use indexmap::IndexMap;
use tracing::{error, info, info_span, warn};

/// Runs every child in registration order and merges their results.
///
/// Ids are only unique per source: when two children report the same id the
/// later child wins, and the collision is logged.
pub struct FanOut {
    name: String,
    children: Vec<Box<dyn Discovery>>,
}

impl FanOut {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Discovery + 'static) -> Self {
        self.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: Box<dyn Discovery>) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|child| child.name()).collect()
    }
}

/// Later entries overwrite earlier ones with the same key
fn merge_into<V>(name: &str, target: &mut IndexMap<ListingId, V>, child: &str, incoming: IndexMap<ListingId, V>) {
    for (id, value) in incoming {
        if target.insert(id.clone(), value).is_some() {
            warn!(group = name, source = child, %id, "Listing id reported by more than one source, keeping the later one");
        }
    }
}

/// Release `children` in reverse order, attempting every one.
///
/// Returns the first error encountered.
fn close_all(children: &mut [Box<dyn Discovery>]) -> Result<()> {
    let mut first_error: Option<ScoutError> = None;

    for child in children.iter_mut().rev() {
        if let Err(e) = child.close() {
            warn!(source = child.name(), error = %e, "Failed to release source");
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl Discovery for FanOut {
    fn name(&self) -> &str {
        &self.name
    }

    /// All-or-nothing: if one child fails to open, the ones already opened are
    /// closed again before the error is returned.
    fn open(&mut self) -> Result<()> {
        let _span = info_span!("group", name = %self.name).entered();

        for idx in 0..self.children.len() {
            if let Err(e) = self.children[idx].open() {
                warn!(source = self.children[idx].name(), error = %e, "Failed to open source, releasing the others");
                if let Err(close_err) = close_all(&mut self.children[..idx]) {
                    warn!(error = %close_err, "Rollback after failed open was incomplete");
                }
                return Err(e);
            }
        }

        info!(sources = ?self.child_names(), "Opened sources");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let _span = info_span!("group", name = %self.name).entered();
        close_all(&mut self.children)
    }

    fn search_all(&mut self) -> Result<Listings> {
        let _span = info_span!("group", name = %self.name).entered();
        let mut all = Listings::new();
        for child in &mut self.children {
            let found = child.search_all()?;
            merge_into(&self.name, &mut all, child.name(), found);
        }
        Ok(all)
    }

    /// A child failing with a non-fatal error is skipped for this poll. A fatal
    /// error un-marks what earlier children returned in this call, so those
    /// listings come back on the next poll, then propagates.
    fn search_new(&mut self) -> Result<Details> {
        let _span = info_span!("group", name = %self.name).entered();
        let mut new = Details::new();
        let mut returned: Vec<(usize, Vec<ListingId>)> = Vec::new();

        for idx in 0..self.children.len() {
            match self.children[idx].search_new() {
                Ok(found) => {
                    returned.push((idx, found.keys().cloned().collect()));
                    merge_into(&self.name, &mut new, self.children[idx].name(), found);
                }
                Err(e) if e.is_fatal() => {
                    error!(source = self.children[idx].name(), error = %e, "Source failed, releasing this poll's listings");
                    for (done, ids) in returned {
                        if let Err(forget_err) = self.children[done].forget(&ids) {
                            warn!(source = self.children[done].name(), error = %forget_err, "Failed to un-mark listings");
                        }
                    }
                    return Err(e);
                }
                Err(e) => {
                    warn!(source = self.children[idx].name(), error = %e, "Skipping source for this poll");
                }
            }
        }

        info!(count = new.len(), "New listings across sources");
        Ok(new)
    }

    /// Sent to every child; the first error is returned after all were tried
    fn forget(&mut self, ids: &[ListingId]) -> Result<()> {
        let _span = info_span!("group", name = %self.name).entered();
        let mut first_error: Option<ScoutError> = None;

        for child in &mut self.children {
            if let Err(e) = child.forget(ids) {
                warn!(source = child.name(), error = %e, "Failed to forget listings");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RenderError, StoreError};
    use crate::models::DetailRecord;
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Records lifecycle calls and fails where told to
    struct Probe {
        name: &'static str,
        listings: Vec<(&'static str, &'static str)>,
        fail_open: bool,
        fail_close: bool,
        fail_search: Option<fn() -> ScoutError>,
        journal: Journal,
    }

    impl Probe {
        fn new(name: &'static str, listings: &[(&'static str, &'static str)], journal: &Journal) -> Self {
            Self {
                name,
                listings: listings.to_vec(),
                fail_open: false,
                fail_close: false,
                fail_search: None,
                journal: journal.clone(),
            }
        }

        fn log(&self, event: &str) {
            self.journal.lock().unwrap().push(format!("{}:{}", event, self.name));
        }
    }

    impl Discovery for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn open(&mut self) -> Result<()> {
            if self.fail_open {
                return Err(ScoutError::Launch(self.name.to_string()));
            }
            self.log("open");
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.log("close");
            if self.fail_close {
                return Err(ScoutError::NotOpen(self.name.to_string()));
            }
            Ok(())
        }

        fn search_all(&mut self) -> Result<Listings> {
            Ok(self
                .listings
                .iter()
                .map(|(id, url)| (id.to_string(), url.to_string()))
                .collect())
        }

        fn search_new(&mut self) -> Result<Details> {
            if let Some(failure) = self.fail_search {
                return Err(failure());
            }
            Ok(self
                .listings
                .iter()
                .map(|(id, url)| (id.to_string(), DetailRecord::bare(*url)))
                .collect())
        }

        fn forget(&mut self, ids: &[ListingId]) -> Result<()> {
            self.log(&format!("forget{}", ids.join(",")));
            Ok(())
        }
    }

    fn journal() -> Journal {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn events(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    #[test]
    fn union_in_registration_order_later_wins() {
        let j = journal();
        let mut group = FanOut::new("all")
            .with_child(Probe::new("a", &[("1", "a1"), ("2", "a2")], &j))
            .with_child(Probe::new("b", &[("2", "b2"), ("3", "b3")], &j));

        let all = group.search_all().unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert_eq!(all["2"], "b2");

        let new = group.search_new().unwrap();
        assert_eq!(new["2"], DetailRecord::bare("b2"));
        assert_eq!(new.len(), 3);
    }

    #[test]
    fn failed_open_releases_already_opened_children() {
        let j = journal();
        let mut broken = Probe::new("c", &[], &j);
        broken.fail_open = true;
        let mut group = FanOut::new("all")
            .with_child(Probe::new("a", &[], &j))
            .with_child(Probe::new("b", &[], &j))
            .with_child(broken)
            .with_child(Probe::new("d", &[], &j));

        assert!(group.open().is_err());
        assert_eq!(events(&j), vec!["open:a", "open:b", "close:b", "close:a"]);
    }

    #[test]
    fn close_attempts_every_child_and_reports_the_first_error() {
        let j = journal();
        let mut b = Probe::new("b", &[], &j);
        b.fail_close = true;
        let mut c = Probe::new("c", &[], &j);
        c.fail_close = true;
        let mut group = FanOut::new("all")
            .with_child(Probe::new("a", &[], &j))
            .with_child(b)
            .with_child(c);

        let err = group.close().unwrap_err();
        assert!(matches!(err, ScoutError::NotOpen(ref name) if name == "c"));
        assert_eq!(events(&j), vec!["close:c", "close:b", "close:a"]);
    }

    #[test]
    fn forget_reaches_every_child() {
        let j = journal();
        let mut group = FanOut::new("all")
            .with_child(Probe::new("a", &[], &j))
            .with_child(FanOut::new("realo").with_child(Probe::new("r1", &[], &j)));

        group.forget(&["1".to_string(), "2".to_string()]).unwrap();
        assert_eq!(events(&j), vec!["forget1,2:a", "forget1,2:r1"]);
        assert_eq!(group.child_names(), vec!["a", "realo"]);
    }

    fn crashed_tab() -> ScoutError {
        RenderError::Session("tab crashed".to_string()).into()
    }

    fn disk_full() -> ScoutError {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        StoreError::io("/state/b.json", io_err).into()
    }

    #[test]
    fn renderer_failure_in_one_child_keeps_the_others() {
        let j = journal();
        let mut b = Probe::new("b", &[("2", "u2")], &j);
        b.fail_search = Some(crashed_tab);
        let mut group = FanOut::new("all")
            .with_child(Probe::new("a", &[("1", "u1")], &j))
            .with_child(b)
            .with_child(Probe::new("c", &[("3", "u3")], &j));

        let new = group.search_new().unwrap();
        assert_eq!(new.keys().collect::<Vec<_>>(), vec!["1", "3"]);
        assert!(events(&j).is_empty());
    }

    #[test]
    fn store_failure_releases_listings_returned_by_earlier_children() {
        let j = journal();
        let mut b = Probe::new("b", &[("2", "u2")], &j);
        b.fail_search = Some(disk_full);
        let mut group = FanOut::new("all")
            .with_child(Probe::new("a", &[("1", "u1")], &j))
            .with_child(b)
            .with_child(Probe::new("c", &[("3", "u3")], &j));

        let err = group.search_new().unwrap_err();
        assert!(matches!(err, ScoutError::Store(_)));
        assert_eq!(events(&j), vec!["forget1:a"]);
    }
}
