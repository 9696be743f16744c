//! In-memory TTL cache backing the RAWG read-through layer.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct CacheSlot<V> {
    value: V,
    fetched_at: Instant,
}

/// Thread-safe map with per-entry expiry. Entries never refresh themselves;
/// the read-through layer re-fetches on a miss and overwrites.
pub struct TtlCache<K, V> {
    max_age: Duration,
    entries: RwLock<HashMap<K, CacheSlot<V>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value for the key if present and not expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|slot| slot.fetched_at.elapsed() < self.max_age)
            .map(|slot| slot.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheSlot {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drops all expired entries. Callers may run this opportunistically;
    /// correctness never depends on it since get() checks expiry itself.
    pub async fn purge_expired(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, slot| slot.fetched_at.elapsed() < self.max_age);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
