//! # npspotify - Passerelle « now playing » Spotify
//!
//! Cette crate sert l'état du lecteur Spotify du propriétaire du site sans
//! dépasser les limites de l'API :
//!
//! - [`CredentialRefresher`] : jeton d'accès réutilisé tant qu'il n'entre pas
//!   dans la marge de sécurité, rafraîchi sinon (un seul refresh en vol)
//! - [`NowPlayingGateway`] : cache-aside de courte durée au-dessus de
//!   `GET /me/player/currently-playing`
//! - [`normalize`] : réduction d'une réponse Spotify en [`PlaybackSnapshot`]
//!
//! Avec la feature `server` (par défaut), [`SpotifyServerExt`] enregistre les
//! routes HTTP sur un `npserver::Server`.
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use npspotify::{NowPlayingGateway, SpotifySettings};
//!
//! # async fn example() -> npspotify::Result<()> {
//! let settings = SpotifySettings {
//!     client_id: Some("id".into()),
//!     client_secret: Some("secret".into()),
//!     refresh_token: Some("refresh".into()),
//!     ..Default::default()
//! };
//!
//! let gateway = NowPlayingGateway::builder(settings).build()?;
//! let snapshot = gateway.get_now_playing().await?;
//! if let Some(track) = snapshot.track {
//!     println!("{} - {}", track.artist_line(), track.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config_ext;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod models;

#[cfg(feature = "server")]
pub mod api_rest;
#[cfg(feature = "server")]
pub mod server_ext;
#[cfg(feature = "server")]
mod server_impl;

pub use api::SpotifyApi;
pub use config_ext::{SpotifyConfigExt, SpotifySettings};
pub use credentials::{
    CachedCredential, CredentialRefresher, CredentialStore, KvCredentialStore,
    MemoryCredentialStore,
};
pub use error::{GatewayErrorKind, Result, SpotifyError};
pub use gateway::{NowPlayingGateway, NowPlayingGatewayBuilder};
pub use models::{PlaybackSnapshot, Track, normalize};

#[cfg(feature = "server")]
pub use api_rest::{SpotifyApiDoc, SpotifyState, create_alias_router, create_api_router};
#[cfg(feature = "server")]
pub use server_ext::SpotifyServerExt;
