//! Key/value store with a fixed time-to-live per entry

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now <= self.expires_at
    }
}

/// Cache where every entry expires `ttl` after it was last written
///
/// Expiry is lazy: an expired entry is reported as absent on read even if
/// [`ExpiringCache::sweep`] never ran. Sweeping only reclaims memory.
#[derive(Debug)]
pub struct ExpiringCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `value`, replacing any previous value and its expiry
    pub async fn set(&self, key: K, value: V) {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .write()
            .await
            .insert(key, CacheEntry { value, expires_at });
    }

    /// Get the value for `key` if it exists and has not expired
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    pub async fn delete(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    /// Atomic read-modify-write
    ///
    /// `f` receives the live value (expired entries are passed as `None`) and
    /// returns the value to store, or `None` to leave the entry untouched. A
    /// stored value gets a fresh expiry. Returns what `f` returned.
    pub async fn update<F>(&self, key: K, f: F) -> Option<V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let current = entries
            .get(&key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| &entry.value);

        let next = f(current)?;
        entries.insert(
            key,
            CacheEntry {
                value: next.clone(),
                expires_at: now + self.ttl,
            },
        );
        Some(next)
    }

    /// Number of entries that have not expired yet
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Physically remove expired entries, returning how many were dropped
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Run [`ExpiringCache::sweep`] every `period` until the handle is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.sweep().await;
                if removed > 0 {
                    trace!("swept {removed} expired cache entries");
                }
            }
        })
    }
}
