use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Enregistrement de cache à durée de vie courte
///
/// Une entrée est valide tant que `now < stored_at + ttl_seconds`. Une entrée
/// expirée est traitée comme absente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub value: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub stored_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl<T> CacheEntry<T> {
    /// Crée une entrée ; un TTL nul est ramené à une seconde
    pub fn new(value: T, stored_at: DateTime<Utc>, ttl_seconds: u64) -> Self {
        Self {
            value,
            stored_at,
            ttl_seconds: ttl_seconds.max(1),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.stored_at + chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}
