use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Concurrent in-memory map whose entries expire after a TTL.
pub struct Cache<K, V> {
    data: DashMap<K, Entry<V>>,
    ttl: Duration,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<K: Eq + Hash, V: Clone> Cache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            data: DashMap::new(),
            ttl,
        }
    }

    /// Live value for `key`. Expired entries are evicted on read.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.data.get(key)?;
        if entry.expires_at > Instant::now() {
            return Some(entry.value.clone());
        }
        drop(entry);
        self.data.remove(key);
        None
    }

    pub fn set(&self, key: K, value: V) {
        self.data.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

}
