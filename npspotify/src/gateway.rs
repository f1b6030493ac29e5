//! Passerelle « now playing »
//!
//! Cache-aside au-dessus de l'API Spotify : un snapshot valide est servi sans
//! appel réseau ; sinon un jeton est obtenu, l'API interrogée, la réponse
//! normalisée puis mise en cache. Les erreurs ne sont jamais mises en cache.

use crate::api::SpotifyApi;
use crate::config_ext::SpotifySettings;
use crate::credentials::{CredentialRefresher, CredentialStore, MemoryCredentialStore};
use crate::error::{Result, SpotifyError};
use crate::models::{PlaybackSnapshot, normalize};
use npcache::{KvStore, SharedClock, SystemClock, TieredCache};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const SNAPSHOT_KEY: &str = "now-playing";

pub struct NowPlayingGateway {
    api: SpotifyApi,
    credentials: Arc<CredentialRefresher>,
    cache: TieredCache<PlaybackSnapshot>,
    clock: SharedClock,
    settings: SpotifySettings,
    /// Un seul remplissage du cache en vol à la fois
    fill_lock: Mutex<()>,
}

/// Builder pour [`NowPlayingGateway`]
pub struct NowPlayingGatewayBuilder {
    settings: SpotifySettings,
    clock: Option<SharedClock>,
    credential_store: Option<Arc<dyn CredentialStore>>,
    remote_cache: Option<Arc<dyn KvStore>>,
    cache_namespace: String,
}

impl NowPlayingGatewayBuilder {
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    /// Partage le cache de snapshots entre instances
    pub fn remote_cache(mut self, store: Option<Arc<dyn KvStore>>) -> Self {
        self.remote_cache = store;
        self
    }

    /// Préfixe des clés du cache distant
    pub fn cache_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cache_namespace = namespace.into();
        self
    }

    pub fn build(self) -> Result<NowPlayingGateway> {
        let http = Client::builder()
            .timeout(self.settings.request_timeout)
            .build()?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = self
            .credential_store
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));

        let credentials = Arc::new(CredentialRefresher::new(
            http.clone(),
            &self.settings,
            store,
            clock.clone(),
        ));

        let cache = TieredCache::builder(self.cache_namespace)
            .ttl_secs(self.settings.cache_ttl_secs)
            .max_capacity(4)
            .maybe_remote(self.remote_cache)
            .clock(clock.clone())
            .build();

        Ok(NowPlayingGateway {
            api: SpotifyApi::new(http, &self.settings.api_base_url),
            credentials,
            cache,
            clock,
            settings: self.settings,
            fill_lock: Mutex::new(()),
        })
    }
}

impl NowPlayingGateway {
    pub fn builder(settings: SpotifySettings) -> NowPlayingGatewayBuilder {
        NowPlayingGatewayBuilder {
            settings,
            clock: None,
            credential_store: None,
            remote_cache: None,
            cache_namespace: "npsite:spotify".to_string(),
        }
    }

    pub fn settings(&self) -> &SpotifySettings {
        &self.settings
    }

    pub fn credentials(&self) -> &Arc<CredentialRefresher> {
        &self.credentials
    }

    pub fn api(&self) -> &SpotifyApi {
        &self.api
    }

    /// Snapshot courant, depuis le cache ou depuis Spotify
    pub async fn get_now_playing(&self) -> Result<PlaybackSnapshot> {
        if let Some(snapshot) = self.cache.get(SNAPSHOT_KEY).await {
            debug!("Now playing served from cache");
            return Ok(snapshot);
        }

        let _guard = self.fill_lock.lock().await;

        // Un appel concurrent a pu remplir le cache pendant l'attente
        if let Some(snapshot) = self.cache.get(SNAPSHOT_KEY).await {
            return Ok(snapshot);
        }

        let snapshot = self.fetch().await?;
        self.cache.put(SNAPSHOT_KEY, snapshot.clone()).await;
        Ok(snapshot)
    }

    /// Force le prochain appel à interroger Spotify
    pub async fn invalidate(&self) {
        self.cache.invalidate(SNAPSHOT_KEY).await;
    }

    async fn fetch(&self) -> Result<PlaybackSnapshot> {
        let token = self.credentials.get_access_token().await?;

        let raw = match self.api.currently_playing(&token).await {
            Ok(raw) => raw,
            Err(SpotifyError::Unauthorized) => {
                warn!("Spotify rejected the access token, dropping it");
                self.credentials.invalidate().await;
                return Err(SpotifyError::Unauthorized);
            }
            Err(e) => {
                warn!("Now playing fetch failed: {}", e);
                return Err(e);
            }
        };

        let fetched_at = self.clock.now();
        let snapshot = match raw {
            Some(raw) => normalize(&raw, fetched_at)?,
            None => PlaybackSnapshot::not_playing(fetched_at),
        };

        match &snapshot.track {
            Some(track) => debug!(
                "Now playing: {} - {} ({})",
                track.artist_line(),
                track.name,
                if snapshot.is_playing { "playing" } else { "paused" }
            ),
            None => debug!("Nothing is playing"),
        }

        Ok(snapshot)
    }
}
