//! Key/value store without expiry

use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::RwLock;

/// Unordered store remembering the last value written per key
#[derive(Debug)]
pub struct SnapshotCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for SnapshotCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> SnapshotCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    /// Store `value`, returning the value it replaced
    pub async fn set(&self, key: K, value: V) -> Option<V> {
        self.entries.write().await.insert(key, value)
    }

    pub async fn delete(&self, key: &K) -> Option<V> {
        self.entries.write().await.remove(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Point-in-time copy of every entry
    ///
    /// Writes after this call are not visible in the returned map.
    pub async fn get_all(&self) -> HashMap<K, V> {
        self.entries.read().await.clone()
    }
}
