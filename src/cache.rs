use dashmap::DashMap;
use std::time::{Duration, Instant};

/// In-process cache tier. Entries older than the TTL read as absent.
pub struct MemoryTier<V> {
    ttl: Duration,
    entries: DashMap<String, (Instant, V)>,
}

impl<V: Clone> MemoryTier<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.0.elapsed() < self.ttl)
            .map(|entry| entry.1.clone())
    }

    pub fn insert(&self, key: &str, value: V) {
        self.entries.insert(key.to_string(), (Instant::now(), value));
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn prune(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.0.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
