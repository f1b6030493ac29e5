//! Rafraîchissement du jeton d'accès Spotify
//!
//! Le [`CredentialRefresher`] sert le jeton courant tant qu'il n'est pas
//! entré dans la marge de sécurité, et en obtient un nouveau auprès de
//! `accounts.spotify.com` sinon. Le jeton est conservé dans un
//! [`CredentialStore`] injecté : en mémoire pour une instance unique, dans le
//! store clé-valeur partagé quand plusieurs instances tournent.

use crate::config_ext::SpotifySettings;
use crate::error::{Result, SpotifyError};
use crate::models::TokenResponse;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use npcache::{KvStore, SharedClock};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Jeton d'accès et son instant d'expiration annoncé par Spotify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedCredential {
    pub token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl CachedCredential {
    pub fn new(token: impl Into<String>, obtained_at: DateTime<Utc>, expires_in_secs: u64) -> Self {
        Self {
            token: token.into(),
            expires_at: obtained_at + chrono::Duration::seconds(expires_in_secs as i64),
        }
    }

    /// Vrai tant que `now < expires_at - margin`
    pub fn is_usable_at(&self, now: DateTime<Utc>, safety_margin_secs: u64) -> bool {
        now < self.expires_at - chrono::Duration::seconds(safety_margin_secs as i64)
    }
}

/// Emplacement unique où vit le jeton courant
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Option<CachedCredential>;
    async fn save(&self, credential: &CachedCredential);
    async fn clear(&self);
}

/// Stockage en mémoire du processus
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Option<CachedCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store initialisé avec un jeton existant
    pub fn with_credential(credential: CachedCredential) -> Self {
        Self {
            slot: RwLock::new(Some(credential)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Option<CachedCredential> {
        self.slot.read().unwrap().clone()
    }

    async fn save(&self, credential: &CachedCredential) {
        *self.slot.write().unwrap() = Some(credential.clone());
    }

    async fn clear(&self) {
        *self.slot.write().unwrap() = None;
    }
}

/// Stockage dans le store clé-valeur partagé entre instances
///
/// Les erreurs du store sont journalisées et traitées comme une absence de
/// jeton : au pire, un refresh de trop.
pub struct KvCredentialStore {
    store: Arc<dyn KvStore>,
    key: String,
    clock: SharedClock,
}

impl KvCredentialStore {
    pub fn new(store: Arc<dyn KvStore>, prefix: &str, clock: SharedClock) -> Self {
        Self {
            store,
            key: format!("{}:spotify:access_token", prefix),
            clock,
        }
    }
}

#[async_trait]
impl CredentialStore for KvCredentialStore {
    async fn load(&self) -> Option<CachedCredential> {
        match self.store.get(&self.key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(credential) => Some(credential),
                Err(e) => {
                    warn!("Discarding malformed stored Spotify token: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read Spotify token from shared store: {}", e);
                None
            }
        }
    }

    async fn save(&self, credential: &CachedCredential) {
        let ttl = (credential.expires_at - self.clock.now()).num_seconds();
        if ttl <= 0 {
            return;
        }
        let raw = match serde_json::to_string(credential) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cannot serialize Spotify token: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set_ex(&self.key, &raw, ttl as u64).await {
            warn!("Failed to write Spotify token to shared store: {}", e);
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.store.del(&self.key).await {
            warn!("Failed to clear Spotify token from shared store: {}", e);
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Produit un jeton d'accès valide, en le rafraîchissant si nécessaire
pub struct CredentialRefresher {
    http: Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    /// Remplacé quand Spotify renvoie un nouveau refresh token
    refresh_token: RwLock<Option<String>>,
    store: Arc<dyn CredentialStore>,
    clock: SharedClock,
    safety_margin_secs: u64,
    /// Un seul refresh en vol à la fois
    refresh_lock: Mutex<()>,
}

impl CredentialRefresher {
    pub fn new(
        http: Client,
        settings: &SpotifySettings,
        store: Arc<dyn CredentialStore>,
        clock: SharedClock,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/api/token", settings.accounts_base_url.trim_end_matches('/')),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            refresh_token: RwLock::new(settings.refresh_token.clone()),
            store,
            clock,
            safety_margin_secs: settings.safety_margin_secs,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Retourne un jeton utilisable, sans appel réseau dans le cas courant
    pub async fn get_access_token(&self) -> Result<String> {
        if let Some(token) = self.usable_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Un autre appelant a pu rafraîchir pendant l'attente
        if let Some(token) = self.usable_token().await {
            return Ok(token);
        }

        let refresh_token = self
            .refresh_token
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| SpotifyError::MissingConfig("spotify.refresh_token".into()))?;

        let credential = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .await?;

        Ok(credential.token)
    }

    /// Échange un code d'autorisation OAuth contre des jetons
    ///
    /// Rien n'est conservé : le compte doit d'abord être vérifié, puis les
    /// jetons adoptés avec [`Self::adopt`].
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        self.post_token_form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    /// Adopte des jetons issus d'un échange de code
    ///
    /// Le jeton d'accès est stocké et le refresh token retourné remplace
    /// celui de la configuration pour la vie du processus.
    pub async fn adopt(&self, response: &TokenResponse) {
        let _guard = self.refresh_lock.lock().await;
        self.accept(response).await;
    }

    /// Oublie le jeton courant, le prochain appel forcera un refresh
    pub async fn invalidate(&self) {
        self.store.clear().await;
    }

    async fn usable_token(&self) -> Option<String> {
        let credential = self.store.load().await?;
        if credential.is_usable_at(self.clock.now(), self.safety_margin_secs) {
            debug!("Reusing Spotify access token until {}", credential.expires_at);
            Some(credential.token)
        } else {
            None
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<CachedCredential> {
        let response = self.post_token_form(form).await?;
        Ok(self.accept(&response).await)
    }

    async fn accept(&self, response: &TokenResponse) -> CachedCredential {
        let credential =
            CachedCredential::new(&response.access_token, self.clock.now(), response.expires_in);
        self.store.save(&credential).await;

        if let Some(rotated) = &response.refresh_token {
            info!("Spotify returned a new refresh token, replacing the configured one");
            *self.refresh_token.write().unwrap() = Some(rotated.clone());
        }

        info!(
            "Spotify access token refreshed, expires at {}",
            credential.expires_at
        );
        credential
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| SpotifyError::MissingConfig("spotify.client_id".into()))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| SpotifyError::MissingConfig("spotify.client_secret".into()))?;

        debug!("Requesting Spotify token ({})", form[0].1);

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<TokenResponse>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<TokenErrorBody>(&text)
            .ok()
            .and_then(|body| body.error_description.or(body.error))
            .unwrap_or_else(|| text.clone());

        warn!("Spotify token request failed ({}): {}", status, reason);

        if status.as_u16() == 400 || status.as_u16() == 401 {
            Err(SpotifyError::CredentialRejected(reason))
        } else {
            Err(SpotifyError::Upstream {
                code: status.as_u16(),
                message: reason,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use npcache::{Clock, ManualClock, MemoryKv};
    use std::time::Duration;

    #[test]
    fn test_safety_margin_applies_before_expiry() {
        let clock = ManualClock::starting_now();
        let now = clock.now();
        let credential = CachedCredential::new("tok", now, 90);

        assert!(credential.is_usable_at(now, 60));
        assert!(credential.is_usable_at(now + chrono::Duration::seconds(29), 60));
        assert!(!credential.is_usable_at(now + chrono::Duration::seconds(30), 60));
    }

    #[test]
    fn test_credential_within_margin_is_not_usable() {
        let now = Utc::now();
        let credential = CachedCredential::new("tok", now, 30);
        assert!(!credential.is_usable_at(now, 60));
    }

    #[tokio::test]
    async fn test_kv_store_roundtrip_and_expiry() {
        let clock = ManualClock::starting_now();
        let shared: SharedClock = Arc::new(clock.clone());
        let kv = Arc::new(MemoryKv::with_clock(shared.clone()));
        let store = KvCredentialStore::new(kv, "test", shared);

        let credential = CachedCredential::new("tok", clock.now(), 3600);
        store.save(&credential).await;
        assert_eq!(store.load().await.map(|c| c.token), Some("tok".to_string()));

        clock.advance(Duration::from_secs(3600));
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_missing_secrets_are_reported() {
        let clock: SharedClock = Arc::new(ManualClock::starting_now());
        let refresher = CredentialRefresher::new(
            Client::new(),
            &SpotifySettings::default(),
            Arc::new(MemoryCredentialStore::new()),
            clock,
        );

        match refresher.get_access_token().await {
            Err(SpotifyError::MissingConfig(key)) => assert_eq!(key, "spotify.refresh_token"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
