//! Durable key-value storage and the per-source seen-set built on top of it.
//!
//! Stores assume a single writer per namespace. Two processes polling the same
//! namespace concurrently can lose each other's updates.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;

use crate::error::StoreError;
use crate::models::{ListingId, Listings};
use serde_json::Value;
use tracing::{debug, info};

/// Opens namespaced key-value handles
pub trait KvBackend: Send + Sync {
    /// Open `namespace`, creating it empty on first use
    fn open(&self, namespace: &str) -> Result<Box<dyn KvHandle>, StoreError>;
}

/// An open namespace
pub trait KvHandle: Send {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value);

    /// Persist all pending writes. Atomic per call.
    fn flush(&mut self) -> Result<(), StoreError>;

    fn close(self: Box<Self>) -> Result<(), StoreError>;
}

const SEEN_KEY: &str = "seen";

/// Previously observed listings of one source, persisted as id -> url
pub struct SeenStore {
    namespace: String,
    handle: Box<dyn KvHandle>,
    seen: Listings,
}

impl SeenStore {
    pub fn open(backend: &dyn KvBackend, namespace: &str) -> Result<Self, StoreError> {
        let mut handle = backend.open(namespace)?;

        let seen = match handle.get(SEEN_KEY) {
            Some(value) => serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
                namespace: namespace.to_string(),
                source,
            })?,
            None => {
                info!(namespace, "Initialising empty seen store");
                let seen = Listings::new();
                handle.set(SEEN_KEY, serde_json::to_value(&seen)?);
                handle.flush()?;
                seen
            }
        };

        debug!(namespace, entries = seen.len(), "Opened seen store");
        Ok(Self {
            namespace: namespace.to_string(),
            handle,
            seen,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains_key(id)
    }

    pub fn get_all(&self) -> &Listings {
        &self.seen
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Record `entries` as seen and flush
    pub fn merge(&mut self, entries: &Listings) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut next = self.seen.clone();
        next.extend(entries.iter().map(|(id, url)| (id.clone(), url.clone())));
        self.persist(next)
    }

    /// Remove `ids` and flush. Unknown ids are ignored.
    ///
    /// Returns how many entries were removed.
    pub fn forget(&mut self, ids: &[ListingId]) -> Result<usize, StoreError> {
        let mut next = self.seen.clone();
        let removed = ids
            .iter()
            .filter(|id| next.shift_remove(id.as_str()).is_some())
            .count();
        if removed > 0 {
            self.persist(next)?;
        }
        Ok(removed)
    }

    pub fn close(self) -> Result<(), StoreError> {
        debug!(namespace = %self.namespace, "Closing seen store");
        self.handle.close()
    }

    /// Flush `next` and adopt it. On failure the in-memory view keeps
    /// matching what was last written.
    fn persist(&mut self, next: Listings) -> Result<(), StoreError> {
        self.handle.set(SEEN_KEY, serde_json::to_value(&next)?);
        self.handle.flush()?;
        self.seen = next;
        Ok(())
    }
}
