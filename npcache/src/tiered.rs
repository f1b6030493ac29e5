//! Cache à deux niveaux
//!
//! Le niveau local est un cache `moka` propre au processus. Le niveau distant,
//! optionnel, est un [`KvStore`] partagé entre instances. Une entrée lue dans
//! le niveau distant est recopiée dans le niveau local.
//!
//! La validité d'une entrée est toujours jugée par [`CacheEntry::is_valid_at`]
//! contre l'horloge injectée ; l'éviction `moka` ne sert qu'à borner la mémoire.

use crate::clock::{SharedClock, SystemClock};
use crate::entry::CacheEntry;
use crate::kv::KvStore;
use moka::future::Cache as MokaCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_CAPACITY: u64 = 256;

/// Cache-aside local + distant pour des valeurs sérialisables
#[derive(Clone)]
pub struct TieredCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    namespace: String,
    ttl_secs: u64,
    local: MokaCache<String, CacheEntry<T>>,
    remote: Option<Arc<dyn KvStore>>,
    clock: SharedClock,
}

impl<T> fmt::Debug for TieredCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredCache")
            .field("namespace", &self.namespace)
            .field("ttl_secs", &self.ttl_secs)
            .field("remote", &self.remote.is_some())
            .finish()
    }
}

/// Builder pour [`TieredCache`]
pub struct TieredCacheBuilder<T> {
    namespace: String,
    ttl_secs: u64,
    max_capacity: u64,
    remote: Option<Arc<dyn KvStore>>,
    clock: Option<SharedClock>,
    _marker: std::marker::PhantomData<T>,
}

impl<T> TieredCacheBuilder<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    pub fn ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs.max(1);
        self
    }

    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Ajoute un niveau distant partagé
    pub fn remote(mut self, store: Arc<dyn KvStore>) -> Self {
        self.remote = Some(store);
        self
    }

    /// Variante de [`Self::remote`] acceptant l'absence de store
    pub fn maybe_remote(mut self, store: Option<Arc<dyn KvStore>>) -> Self {
        self.remote = store;
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> TieredCache<T> {
        let local = MokaCache::builder()
            .max_capacity(self.max_capacity)
            .time_to_live(Duration::from_secs(self.ttl_secs))
            .build();

        TieredCache {
            namespace: self.namespace,
            ttl_secs: self.ttl_secs,
            local,
            remote: self.remote,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }
}

impl<T> TieredCache<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    pub fn builder(namespace: impl Into<String>) -> TieredCacheBuilder<T> {
        TieredCacheBuilder {
            namespace: namespace.into(),
            ttl_secs: 60,
            max_capacity: DEFAULT_CAPACITY,
            remote: None,
            clock: None,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn remote_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Retourne la valeur si une entrée valide existe dans l'un des niveaux
    pub async fn get(&self, key: &str) -> Option<T> {
        self.get_entry(key).await.map(|entry| entry.value)
    }

    /// Retourne l'entrée complète (valeur + date de stockage)
    pub async fn get_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        let now = self.clock.now();

        if let Some(entry) = self.local.get(key).await {
            if entry.is_valid_at(now) {
                debug!("Cache hit (local) {}:{}", self.namespace, key);
                return Some(entry);
            }
            self.local.invalidate(key).await;
        }

        let remote = self.remote.as_ref()?;
        let raw = match remote.get(&self.remote_key(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Remote cache read failed for {}:{}: {}", self.namespace, key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding malformed cache entry {}:{}: {}", self.namespace, key, e);
                return None;
            }
        };

        if !entry.is_valid_at(now) {
            return None;
        }

        debug!("Cache hit (remote) {}:{}", self.namespace, key);
        self.local.insert(key.to_string(), entry.clone()).await;
        Some(entry)
    }

    /// Stocke une valeur dans les deux niveaux, horodatée par l'horloge
    pub async fn put(&self, key: &str, value: T) -> CacheEntry<T> {
        let entry = CacheEntry::new(value, self.clock.now(), self.ttl_secs);
        self.local.insert(key.to_string(), entry.clone()).await;

        if let Some(remote) = &self.remote {
            match serde_json::to_string(&entry) {
                Ok(raw) => {
                    if let Err(e) = remote
                        .set_ex(&self.remote_key(key), &raw, self.ttl_secs)
                        .await
                    {
                        warn!("Remote cache write failed for {}:{}: {}", self.namespace, key, e);
                    }
                }
                Err(e) => warn!("Cannot serialize cache entry {}:{}: {}", self.namespace, key, e),
            }
        }

        entry
    }

    pub async fn invalidate(&self, key: &str) {
        self.local.invalidate(key).await;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.del(&self.remote_key(key)).await {
                warn!("Remote cache delete failed for {}:{}: {}", self.namespace, key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::kv::MemoryKv;

    fn cache_with(clock: &ManualClock, remote: Option<Arc<dyn KvStore>>) -> TieredCache<String> {
        TieredCache::builder("test")
            .ttl_secs(10)
            .clock(Arc::new(clock.clone()))
            .maybe_remote(remote)
            .build()
    }

    #[tokio::test]
    async fn test_entry_expires_with_clock() {
        let clock = ManualClock::starting_now();
        let cache = cache_with(&clock, None);

        cache.put("k", "v".to_string()).await;
        clock.advance(Duration::from_millis(9_999));
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_remote_hit_repopulates_local() {
        let clock = ManualClock::starting_now();
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::with_clock(Arc::new(clock.clone())));

        let writer = cache_with(&clock, Some(kv.clone()));
        let reader = cache_with(&clock, Some(kv.clone()));

        let stored = writer.put("k", "shared".to_string()).await;
        let read = reader.get_entry("k").await.unwrap();
        assert_eq!(read, stored);

        // Le niveau local suffit une fois la clé distante supprimée
        kv.del("test:k").await.unwrap();
        assert_eq!(reader.get("k").await.as_deref(), Some("shared"));
    }

    #[tokio::test]
    async fn test_malformed_remote_entry_is_a_miss() {
        let clock = ManualClock::starting_now();
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::with_clock(Arc::new(clock.clone())));
        kv.set_ex("test:k", "not json", 10).await.unwrap();

        let cache = cache_with(&clock, Some(kv));
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_clears_both_tiers() {
        let clock = ManualClock::starting_now();
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::with_clock(Arc::new(clock.clone())));
        let cache = cache_with(&clock, Some(kv.clone()));

        cache.put("k", "v".to_string()).await;
        cache.invalidate("k").await;

        assert_eq!(cache.get("k").await, None);
        assert_eq!(kv.get("test:k").await.unwrap(), None);
    }
}
