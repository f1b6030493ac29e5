//! Extension npserver pour Spotify
//!
//! `npspotify` ajoute ses routes à `npserver::Server` sans que `npserver`
//! dépende de `npspotify`.
//!
//! ```rust,no_run
//! use npserver::ServerBuilder;
//! use npspotify::SpotifyServerExt;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut server = ServerBuilder::new_configured().build();
//! server.init_spotify().await?;
//! server.start().await?;
//! server.wait().await;
//! # Ok(())
//! # }
//! ```

use crate::gateway::NowPlayingGateway;
use anyhow::Result;
use std::sync::Arc;

pub trait SpotifyServerExt {
    /// Construit la passerelle depuis la configuration et enregistre les routes
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /api/spotify/now-playing` (et l'alias `GET /now-playing`)
    /// - `GET /api/spotify/callback`
    /// - Swagger UI sous `/swagger-ui/spotify`
    async fn init_spotify(&mut self) -> Result<Arc<NowPlayingGateway>>;

    /// Enregistre les routes autour d'une passerelle déjà construite
    async fn init_spotify_with_gateway(
        &mut self,
        gateway: Arc<NowPlayingGateway>,
        development: bool,
    ) -> Result<Arc<NowPlayingGateway>>;
}
