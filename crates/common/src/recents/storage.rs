//! Key/value backends for client-local state

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// String key/value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// JSON object file mapping keys to string values
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> io::Result<Map<String, Value>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Map::new()),
            Ok(text) => match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => Ok(map),
                _ => Err(io::Error::new(io::ErrorKind::InvalidData, "expected a JSON object")),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e),
        }
    }

    fn save(&self, map: &Map<String, Value>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Replace atomically so a crash never leaves half a file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        fs::rename(&tmp, &self.path)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self
            .load()?
            .get(key)
            .and_then(Value::as_str)
            .map(String::from))
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        // A corrupt file is replaced rather than blocking writes
        let mut map = self.load().unwrap_or_default();
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&map)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut map = self.load().unwrap_or_default();
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recents::{RecentJob, RecentsStore, MAX_RECENTS, RECENTS_KEY};
    use crate::platform::Platform;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/state.json"));

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_recents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recents.json");

        let first = RecentsStore::new(Arc::new(FileStore::new(&path)), MAX_RECENTS);
        first.add(RecentJob::new(Uuid::from_u128(7), "Ama", Platform::Threads));

        let reopened = RecentsStore::new(Arc::new(FileStore::new(&path)), MAX_RECENTS);
        let recents = reopened.list();
        assert_eq!(recents.len(), 1);
        assert_eq!(recents[0].influencer, "Ama");
    }

    #[test]
    fn test_corrupt_file_reads_empty_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recents.json");
        fs::write(&path, "[[[").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get(RECENTS_KEY).is_err());

        let recents = RecentsStore::new(Arc::new(store), MAX_RECENTS);
        assert!(recents.list().is_empty());
        recents.add(RecentJob::new(Uuid::from_u128(1), "x", Platform::Instagram));
        assert_eq!(recents.list().len(), 1);
    }
}
