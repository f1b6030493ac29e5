//! Limiteur de débit à fenêtre fixe
//!
//! Pour chaque client, un compteur `INCR` est ouvert au premier appel de la
//! fenêtre et reçoit un `EXPIRE`. Le client est limité dès que le compteur
//! dépasse le maximum autorisé.

use crate::error::Result;
use crate::kv::KvStore;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    prefix: String,
    max_requests: i64,
    window_secs: u64,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("prefix", &self.prefix)
            .field("max_requests", &self.max_requests)
            .field("window_secs", &self.window_secs)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn KvStore>,
        prefix: impl Into<String>,
        max_requests: u32,
        window_secs: u64,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            max_requests: i64::from(max_requests),
            window_secs: window_secs.max(1),
        }
    }

    pub fn max_requests(&self) -> i64 {
        self.max_requests
    }

    /// Compte une requête du client et indique s'il a dépassé la limite
    pub async fn is_limited(&self, client: &str) -> Result<bool> {
        let key = format!("{}:{}", self.prefix, client);
        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.store.expire(&key, self.window_secs).await?;
        }
        debug!("Rate limit {} -> {}/{}", key, count, self.max_requests);
        Ok(count > self.max_requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::kv::MemoryKv;
    use std::time::Duration;

    #[tokio::test]
    async fn test_window_limits_then_resets() {
        let clock = ManualClock::starting_now();
        let store = Arc::new(MemoryKv::with_clock(Arc::new(clock.clone())));
        let limiter = RateLimiter::new(store, "rl:test", 5, 60);

        for _ in 0..5 {
            assert!(!limiter.is_limited("1.2.3.4").await.unwrap());
        }
        assert!(limiter.is_limited("1.2.3.4").await.unwrap());
        // Un autre client a son propre compteur
        assert!(!limiter.is_limited("5.6.7.8").await.unwrap());

        clock.advance(Duration::from_secs(60));
        assert!(!limiter.is_limited("1.2.3.4").await.unwrap());
    }
}
