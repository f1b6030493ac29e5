//! # npcache - Cache-aside à deux niveaux
//!
//! Cette crate regroupe tout ce dont les passerelles HTTP ont besoin pour
//! absorber les rafales de requêtes sans solliciter les API tierces :
//!
//! - [`Clock`] : source de temps injectable ([`SystemClock`], [`ManualClock`])
//! - [`CacheEntry`] : valeur + date de stockage + TTL
//! - [`KvStore`] : store clé-valeur (`GET`, `SET .. EX`, `INCR`, `EXPIRE`, `DEL`)
//!   avec une implémentation en mémoire ([`MemoryKv`]) et une implémentation
//!   REST Upstash ([`UpstashKv`])
//! - [`TieredCache`] : cache local `moka` + tier distant optionnel
//! - [`RateLimiter`] : limiteur à fenêtre fixe au-dessus d'un [`KvStore`]
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use npcache::{TieredCache, SystemClock};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let cache: TieredCache<String> = TieredCache::builder("avatars")
//!     .ttl_secs(3600)
//!     .clock(Arc::new(SystemClock))
//!     .build();
//!
//! cache.put("me", "https://cdn.example/me.png".to_string()).await;
//! assert!(cache.get("me").await.is_some());
//! # }
//! ```

pub mod clock;
pub mod config_ext;
pub mod entry;
pub mod error;
pub mod kv;
pub mod rate_limit;
pub mod tiered;
pub mod upstash;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config_ext::{kv_store_from_config, remote_store_from_config, CacheConfigExt};
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use kv::{KvStore, MemoryKv};
pub use rate_limit::RateLimiter;
pub use tiered::{TieredCache, TieredCacheBuilder};
pub use upstash::UpstashKv;
