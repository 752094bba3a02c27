use super::{KvBackend, KvHandle};
use crate::error::StoreError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Namespaces = HashMap<String, Map<String, Value>>;

/// Process-local backend. Flushed data outlives handles but not the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    namespaces: Arc<Mutex<Namespaces>>,
    failing: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flushed contents of `namespace`, if it was ever opened or seeded
    pub fn snapshot(&self, namespace: &str) -> Option<Map<String, Value>> {
        self.lock().get(namespace).cloned()
    }

    pub fn seed(&self, namespace: &str, key: &str, value: Value) {
        self.lock()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// While set, every flush fails as if the medium were full
    pub fn fail_flushes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Namespaces> {
        self.namespaces
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvBackend for MemoryBackend {
    fn open(&self, namespace: &str) -> Result<Box<dyn KvHandle>, StoreError> {
        let data = self
            .lock()
            .entry(namespace.to_string())
            .or_default()
            .clone();

        Ok(Box::new(MemoryHandle {
            backend: self.clone(),
            namespace: namespace.to_string(),
            data,
        }))
    }
}

struct MemoryHandle {
    backend: MemoryBackend,
    namespace: String,
    data: Map<String, Value>,
}

impl KvHandle for MemoryHandle {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if self.backend.failing.load(Ordering::SeqCst) {
            return Err(StoreError::io(
                format!("memory://{}", self.namespace),
                io::Error::new(io::ErrorKind::Other, "no space left"),
            ));
        }
        self.backend
            .lock()
            .insert(self.namespace.clone(), self.data.clone());
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
