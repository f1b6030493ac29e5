//! Store clé-valeur partagé
//!
//! Le trait [`KvStore`] reprend le sous-ensemble de commandes Redis utilisé
//! par le site. [`MemoryKv`] le réalise en mémoire pour un déploiement mono
//! instance et pour les tests ; [`crate::UpstashKv`] parle à un Redis hébergé.

use crate::clock::{Clock, SharedClock, SystemClock};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// `GET key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// `SET key value EX ttl_secs`
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// `INCR key`, la clé absente vaut 0
    async fn incr(&self, key: &str) -> Result<i64>;

    /// `EXPIRE key secs`, retourne `false` si la clé n'existe pas
    async fn expire(&self, key: &str, secs: u64) -> Result<bool>;

    /// `DEL key`
    async fn del(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Slot {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Store clé-valeur en mémoire, avec expiration jugée contre une [`Clock`]
#[derive(Debug, Clone)]
pub struct MemoryKv {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    clock: SharedClock,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    fn deadline(&self, secs: u64) -> DateTime<Utc> {
        self.clock.now() + chrono::Duration::seconds(secs as i64)
    }

    /// Nombre de clés conservées, expirées comprises tant qu'aucune écriture ne les a purgées
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}

/// Purge les clés expirées
///
/// Appelée à chaque écriture : une clé jamais relue (un compteur par IP
/// par exemple) ne reste pas en mémoire au-delà de son TTL.
fn sweep(slots: &mut HashMap<String, Slot>, now: DateTime<Utc>) {
    slots.retain(|_, slot| slot.is_live(now));
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        let mut slots = self.slots.lock().await;
        match slots.get(key) {
            Some(slot) if slot.is_live(now) => Ok(Some(slot.value.clone())),
            Some(_) => {
                slots.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let now = self.clock.now();
        let slot = Slot {
            value: value.to_string(),
            expires_at: Some(self.deadline(ttl_secs)),
        };
        let mut slots = self.slots.lock().await;
        sweep(&mut slots, now);
        slots.insert(key.to_string(), slot);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let now = self.clock.now();
        let mut slots = self.slots.lock().await;
        sweep(&mut slots, now);

        if !slots.contains_key(key) {
            slots.insert(
                key.to_string(),
                Slot {
                    value: "0".to_string(),
                    expires_at: None,
                },
            );
        }
        let slot = slots
            .get_mut(key)
            .ok_or_else(|| CacheError::Remote(format!("slot {} vanished", key)))?;

        let current: i64 = slot
            .value
            .parse()
            .map_err(|_| CacheError::NotAnInteger(key.to_string()))?;
        let next = current + 1;
        // INCR conserve le TTL existant
        slot.value = next.to_string();
        Ok(next)
    }

    async fn expire(&self, key: &str, secs: u64) -> Result<bool> {
        let now = self.clock.now();
        let deadline = self.deadline(secs);
        let mut slots = self.slots.lock().await;
        match slots.get_mut(key) {
            Some(slot) if slot.is_live(now) => {
                slot.expires_at = Some(deadline);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.slots.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_ex_expires() {
        let clock = ManualClock::starting_now();
        let kv = MemoryKv::with_clock(Arc::new(clock.clone()));

        kv.set_ex("k", "v", 5).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));

        clock.advance(Duration::from_secs(5));
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incr_keeps_ttl() {
        let clock = ManualClock::starting_now();
        let kv = MemoryKv::with_clock(Arc::new(clock.clone()));

        assert_eq!(kv.incr("hits").await.unwrap(), 1);
        assert!(kv.expire("hits", 60).await.unwrap());
        assert_eq!(kv.incr("hits").await.unwrap(), 2);

        clock.advance(Duration::from_secs(61));
        assert_eq!(kv.incr("hits").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_rejects_non_integer() {
        let kv = MemoryKv::new();
        kv.set_ex("k", "abc", 10).await.unwrap();
        assert!(matches!(
            kv.incr("k").await,
            Err(CacheError::NotAnInteger(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_counters_are_swept_on_write() {
        let clock = ManualClock::starting_now();
        let kv = MemoryKv::with_clock(Arc::new(clock.clone()));

        for i in 0..100 {
            let key = format!("rate:198.51.100.{}", i);
            kv.incr(&key).await.unwrap();
            kv.expire(&key, 60).await.unwrap();
        }
        assert_eq!(kv.len().await, 100);

        clock.advance(Duration::from_secs(61));
        kv.incr("rate:203.0.113.1").await.unwrap();
        assert_eq!(kv.len().await, 1);

        clock.advance(Duration::from_secs(1));
        kv.set_ex("other", "v", 5).await.unwrap();
        // Le compteur sans TTL survit à la purge
        assert_eq!(kv.len().await, 2);
    }

    #[tokio::test]
    async fn test_expire_on_missing_key() {
        let kv = MemoryKv::new();
        assert!(!kv.expire("missing", 10).await.unwrap());
        kv.del("missing").await.unwrap();
    }
}
