//! Store clé-valeur Upstash (Redis via REST)
//!
//! Chaque commande est envoyée en `POST <rest_url>` avec pour corps le
//! tableau JSON de la commande (`["SET","k","v","EX","60"]`) et un jeton
//! `Bearer`. La réponse est `{"result": ...}` ou `{"error": "..."}`.

use crate::error::{CacheError, Result};
use crate::kv::KvStore;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout par défaut des appels au store distant
const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
struct UpstashResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Client REST Upstash
#[derive(Debug, Clone)]
pub struct UpstashKv {
    client: Client,
    rest_url: String,
    token: String,
}

impl UpstashKv {
    pub fn new(rest_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, rest_url, token))
    }

    /// Réutilise un `reqwest::Client` existant (pool de connexions partagé)
    pub fn with_client(client: Client, rest_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Exécute une commande et retourne le champ `result`
    async fn command(&self, args: &[&str]) -> Result<Value> {
        debug!("Upstash command {}", args.first().copied().unwrap_or_default());

        let response = self
            .client
            .post(&self.rest_url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let parsed: UpstashResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                warn!("Upstash error ({}): {}", status, text);
                return Err(CacheError::Remote(format!("HTTP {}", status)));
            }
            Err(e) => return Err(CacheError::Json(e)),
        };

        if let Some(error) = parsed.error {
            warn!("Upstash error ({}): {}", status, error);
            return Err(CacheError::Remote(error));
        }
        if !status.is_success() {
            return Err(CacheError::Remote(format!("HTTP {}", status)));
        }

        Ok(parsed.result.unwrap_or(Value::Null))
    }
}

fn as_integer(value: &Value, key: &str) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| CacheError::NotAnInteger(key.to_string())),
        Value::String(s) => s
            .parse()
            .map_err(|_| CacheError::NotAnInteger(key.to_string())),
        _ => Err(CacheError::NotAnInteger(key.to_string())),
    }
}

#[async_trait]
impl KvStore for UpstashKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.command(&["GET", key]).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let ttl = ttl_secs.max(1).to_string();
        self.command(&["SET", key, value, "EX", &ttl]).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let result = self.command(&["INCR", key]).await?;
        as_integer(&result, key)
    }

    async fn expire(&self, key: &str, secs: u64) -> Result<bool> {
        let secs = secs.to_string();
        let result = self.command(&["EXPIRE", key, &secs]).await?;
        Ok(as_integer(&result, key)? == 1)
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.command(&["DEL", key]).await?;
        Ok(())
    }
}
