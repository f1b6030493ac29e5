//! Extension pour lire la configuration du store clé-valeur dans npconfig
//!
//! ```yaml
//! kv:
//!   rest_url: https://eu1-example.upstash.io
//!   rest_token: "..."
//!   prefix: npsite
//! ```

use crate::clock::SharedClock;
use crate::kv::{KvStore, MemoryKv};
use crate::upstash::UpstashKv;
use npconfig::Config;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_PREFIX: &str = "npsite";

/// Trait d'extension de `npconfig::Config` pour le store clé-valeur
pub trait CacheConfigExt {
    /// URL REST du store distant, si configurée
    fn get_kv_rest_url(&self) -> Option<String>;

    /// Jeton du store distant, si configuré
    fn get_kv_rest_token(&self) -> Option<String>;

    /// Préfixe appliqué à toutes les clés partagées
    fn get_kv_prefix(&self) -> String;
}

impl CacheConfigExt for Config {
    fn get_kv_rest_url(&self) -> Option<String> {
        self.get_string(&["kv", "rest_url"])
    }

    fn get_kv_rest_token(&self) -> Option<String> {
        self.get_string(&["kv", "rest_token"])
    }

    fn get_kv_prefix(&self) -> String {
        self.get_string(&["kv", "prefix"])
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string())
    }
}

/// Store distant partagé, s'il est configuré et joignable
pub fn remote_store_from_config(config: &Config) -> Option<Arc<dyn KvStore>> {
    let (url, token) = match (config.get_kv_rest_url(), config.get_kv_rest_token()) {
        (Some(url), Some(token)) => (url, token),
        _ => return None,
    };

    match UpstashKv::new(url.clone(), token) {
        Ok(store) => {
            info!("Using shared key-value store at {}", url);
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!("Cannot create key-value client for {}: {}", url, e);
            None
        }
    }
}

/// Store partagé si configuré, sinon un store en mémoire propre au processus
pub fn kv_store_from_config(config: &Config, clock: SharedClock) -> Arc<dyn KvStore> {
    remote_store_from_config(config).unwrap_or_else(|| {
        info!("No shared key-value store configured, using in-memory store");
        Arc::new(MemoryKv::with_clock(clock))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_defaults() {
        let config = Config::from_yaml_str("kv: {}\n").unwrap();
        assert_eq!(config.get_kv_prefix(), "npsite");
        assert!(remote_store_from_config(&config).is_none());
    }

    #[test]
    fn test_remote_requires_both_url_and_token() {
        let config = Config::from_yaml_str("kv:\n  rest_url: http://127.0.0.1:1\n").unwrap();
        assert!(remote_store_from_config(&config).is_none());

        let config = Config::from_yaml_str(
            "kv:\n  rest_url: http://127.0.0.1:1\n  rest_token: t\n  prefix: site\n",
        )
        .unwrap();
        assert!(remote_store_from_config(&config).is_some());
        assert_eq!(config.get_kv_prefix(), "site");
    }
}
