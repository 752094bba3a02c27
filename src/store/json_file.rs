use super::{KvBackend, KvHandle};
use crate::error::StoreError;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores each namespace as `<dir>/<namespace>.json`
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }
}

impl KvBackend for JsonFileBackend {
    fn open(&self, namespace: &str) -> Result<Box<dyn KvHandle>, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let path = self.path_for(namespace);
        let data = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                namespace: namespace.to_string(),
                source,
            })?
        } else {
            Map::new()
        };

        debug!(path = %path.display(), keys = data.len(), "Opened store file");
        Ok(Box::new(JsonFileHandle {
            path,
            data,
            dirty: false,
        }))
    }
}

struct JsonFileHandle {
    path: PathBuf,
    data: Map<String, Value>,
    dirty: bool,
}

impl KvHandle for JsonFileHandle {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        write_atomically(&self.path, &self.data)?;
        self.dirty = false;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), StoreError> {
        self.flush()
    }
}

/// Write to a sibling temp file and rename it over `path`
fn write_atomically(path: &Path, data: &Map<String, Value>) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}
