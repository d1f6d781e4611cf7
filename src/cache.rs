//! Scan-state reconnection cache.
//!
//! Re-attaching a widget to a root it already scanned should resume
//! instantly instead of rescanning tens of thousands of files. The
//! subfolder provider snapshots its scan state here on disconnect,
//! keyed by root path, and restores it on the next initialize or
//! reconnect.
//!
//! The cache is an explicit, injected service rather than an ambient
//! singleton: callers share it via [`SharedScanCache`]. Eviction is
//! least-recently-accessed. Writes are last-writer-wins; two instances
//! scanning the same root concurrently are not deduplicated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::provider::subfolder::ScanSnapshot;

/// Handle shared between widget instances.
pub type SharedScanCache = Arc<Mutex<ScanCache>>;

/// Create a shared cache with the given capacity.
pub fn shared(capacity: usize) -> SharedScanCache {
    Arc::new(Mutex::new(ScanCache::new(capacity)))
}

struct CacheSlot {
    snapshot: ScanSnapshot,
    last_access: u64,
}

/// Bounded store of scan snapshots keyed by root path.
pub struct ScanCache {
    entries: HashMap<String, CacheSlot>,
    capacity: usize,
    clock: u64,
}

impl ScanCache {
    /// Create a cache holding at most `capacity` snapshots.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    /// Store a snapshot, evicting the least-recently-accessed entry if
    /// the cache is full.
    pub fn store(&mut self, root: &str, snapshot: ScanSnapshot) {
        self.clock += 1;
        self.entries.insert(
            root.to_string(),
            CacheSlot {
                snapshot,
                last_access: self.clock,
            },
        );

        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                tracing::debug!("scan cache evicting snapshot for {key}");
                self.entries.remove(&key);
            }
        }
    }

    /// Fetch a snapshot for a root, refreshing its access time.
    pub fn get(&mut self, root: &str) -> Option<ScanSnapshot> {
        self.clock += 1;
        let clock = self.clock;
        let slot = self.entries.get_mut(root)?;
        slot.last_access = clock;
        Some(slot.snapshot.clone())
    }

    /// Drop the snapshot for a root, if any.
    pub fn remove(&mut self, root: &str) {
        self.entries.remove(root);
    }

    pub fn contains(&self, root: &str) -> bool {
        self.entries.contains_key(root)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ScanSnapshot {
        ScanSnapshot::default()
    }

    #[test]
    fn test_store_and_get() {
        let mut cache = ScanCache::new(4);
        assert!(cache.get("/photos").is_none());

        cache.store("/photos", snapshot());
        assert!(cache.contains("/photos"));
        assert!(cache.get("/photos").is_some());
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = ScanCache::new(2);
        cache.store("/a", snapshot());
        cache.store("/b", snapshot());

        // Touch /a so /b becomes the eviction candidate.
        cache.get("/a");
        cache.store("/c", snapshot());

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("/a"));
        assert!(!cache.contains("/b"));
        assert!(cache.contains("/c"));
    }

    #[test]
    fn test_store_overwrites() {
        let mut cache = ScanCache::new(2);
        cache.store("/a", snapshot());
        cache.store("/a", snapshot());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut cache = ScanCache::new(2);
        cache.store("/a", snapshot());
        cache.remove("/a");
        assert!(cache.is_empty());
    }
}
