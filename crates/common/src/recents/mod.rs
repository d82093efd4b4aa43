//! Recently viewed jobs
//!
//! A short most-recent-first list kept in client-local key/value storage
//! under a single key. Reads never fail: missing, unreadable or malformed
//! data reads as an empty list.

mod storage;

pub use storage::{FileStore, KeyValueStore, MemoryStore};

use crate::platform::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::warn;
use uuid::Uuid;

/// Storage key holding the JSON array
pub const RECENTS_KEY: &str = "scraping_job_recents";

/// Number of entries kept
pub const MAX_RECENTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentJob {
    pub job_id: Uuid,
    pub influencer: String,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
}

impl RecentJob {
    pub fn new(job_id: Uuid, influencer: impl Into<String>, platform: Platform) -> Self {
        Self {
            job_id,
            influencer: influencer.into(),
            platform,
            created_at: Utc::now(),
        }
    }
}

/// Capped recents list over a key/value store
#[derive(Clone)]
pub struct RecentsStore {
    storage: Arc<dyn KeyValueStore>,
    capacity: usize,
    // Serializes read-modify-write cycles
    write_lock: Arc<Mutex<()>>,
}

impl RecentsStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self {
            storage,
            capacity: capacity.max(1),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// In-memory store with the default capacity
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()), MAX_RECENTS)
    }

    /// Current list, most recent first
    pub fn list(&self) -> Vec<RecentJob> {
        let raw = match self.storage.get(RECENTS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Recents storage unavailable");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Discarding malformed recents");
            Vec::new()
        })
    }

    /// Move `job` to the front, dropping any older copy and the overflow
    pub fn add(&self, job: RecentJob) -> Vec<RecentJob> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut updated = Vec::with_capacity(self.capacity);
        let job_id = job.job_id;
        updated.push(job);
        updated.extend(self.list().into_iter().filter(|r| r.job_id != job_id));
        updated.truncate(self.capacity);

        self.write(&updated);
        updated
    }

    /// Remove one job
    pub fn remove(&self, job_id: Uuid) -> Vec<RecentJob> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut recents = self.list();
        recents.retain(|r| r.job_id != job_id);
        self.write(&recents);
        recents
    }

    pub fn clear(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Err(e) = self.storage.remove(RECENTS_KEY) {
            warn!(error = %e, "Failed to clear recents");
        }
    }

    fn write(&self, recents: &[RecentJob]) {
        let result = serde_json::to_string(recents)
            .map_err(std::io::Error::from)
            .and_then(|json| self.storage.set(RECENTS_KEY, &json));

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist recents");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn recent(n: u128) -> RecentJob {
        RecentJob::new(Uuid::from_u128(n), format!("influencer-{}", n), Platform::Instagram)
    }

    #[test]
    fn test_add_prepends() {
        let store = RecentsStore::in_memory();
        store.add(recent(1));
        store.add(recent(2));
        let ids: Vec<_> = store.list().iter().map(|r| r.job_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_full_list_drops_least_recent() {
        let store = RecentsStore::in_memory();
        for n in 1..=10 {
            store.add(recent(n));
        }
        let updated = store.add(recent(11));
        assert_eq!(updated.len(), 10);
        assert_eq!(updated[0].job_id.as_u128(), 11);
        assert!(updated.iter().all(|r| r.job_id.as_u128() != 1));
    }

    #[test]
    fn test_existing_job_moves_to_front() {
        let store = RecentsStore::in_memory();
        for n in 1..=10 {
            store.add(recent(n));
        }
        let updated = store.add(recent(4));
        assert_eq!(updated.len(), 10);
        assert_eq!(updated[0].job_id.as_u128(), 4);
        assert_eq!(updated.iter().filter(|r| r.job_id.as_u128() == 4).count(), 1);
        // Nothing else was evicted
        assert!(updated.iter().any(|r| r.job_id.as_u128() == 1));
    }

    #[test]
    fn test_remove_and_clear() {
        let store = RecentsStore::in_memory();
        store.add(recent(1));
        store.add(recent(2));
        let left = store.remove(Uuid::from_u128(1));
        assert_eq!(left.len(), 1);
        store.clear();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_malformed_data_reads_empty() {
        let storage = Arc::new(MemoryStore::default());
        storage.set(RECENTS_KEY, "{not json").unwrap();
        let store = RecentsStore::new(storage, MAX_RECENTS);
        assert!(store.list().is_empty());

        // Writing recovers the key
        store.add(recent(1));
        assert_eq!(store.list().len(), 1);
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> io::Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }

        fn set(&self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }

        fn remove(&self, _key: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_unavailable_storage_degrades() {
        let store = RecentsStore::new(Arc::new(BrokenStore), MAX_RECENTS);
        assert!(store.list().is_empty());
        assert_eq!(store.add(recent(1)).len(), 1);
        store.clear();
    }
}
