//! Implémentation de [`SpotifyServerExt`] pour `npserver::Server`

use crate::api_rest::{SpotifyApiDoc, SpotifyState, create_alias_router, create_api_router};
use crate::config_ext::SpotifyConfigExt;
use crate::credentials::{CredentialStore, KvCredentialStore, MemoryCredentialStore};
use crate::gateway::NowPlayingGateway;
use crate::server_ext::SpotifyServerExt;
use anyhow::Result;
use npcache::{CacheConfigExt, SharedClock, SystemClock, remote_store_from_config};
use npserver::Server;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

impl SpotifyServerExt for Server {
    async fn init_spotify(&mut self) -> Result<Arc<NowPlayingGateway>> {
        info!("Initializing Spotify gateway from configuration");

        let config = npconfig::get_config();
        let settings = config.get_spotify_settings();
        let prefix = config.get_kv_prefix();
        let clock: SharedClock = Arc::new(SystemClock);
        let remote = remote_store_from_config(&config);

        let store: Arc<dyn CredentialStore> = match &remote {
            Some(kv) => Arc::new(KvCredentialStore::new(kv.clone(), &prefix, clock.clone())),
            None => Arc::new(MemoryCredentialStore::new()),
        };

        if settings.client_id.is_none() || settings.refresh_token.is_none() {
            info!("Spotify secrets not configured yet, /now-playing will answer 500");
        }

        let gateway = NowPlayingGateway::builder(settings)
            .clock(clock)
            .credential_store(store)
            .remote_cache(remote)
            .cache_namespace(format!("{}:spotify", prefix))
            .build()?;

        let development = config.get_environment().is_development();
        self.init_spotify_with_gateway(Arc::new(gateway), development)
            .await
    }

    async fn init_spotify_with_gateway(
        &mut self,
        gateway: Arc<NowPlayingGateway>,
        development: bool,
    ) -> Result<Arc<NowPlayingGateway>> {
        let state = SpotifyState::new(gateway.clone(), development);

        self.add_openapi(create_api_router(state.clone()), SpotifyApiDoc::openapi(), "spotify")
            .await;
        self.add_router("/", create_alias_router(state)).await;

        info!("Spotify endpoints available at /api/spotify/* and /now-playing");
        Ok(gateway)
    }
}
