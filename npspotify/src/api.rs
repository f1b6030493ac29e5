//! Client bas niveau de l'API Web Spotify

use crate::error::{Result, SpotifyError};
use crate::models::{RawCurrentlyPlaying, RawUserProfile};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

/// Accès aux endpoints `/me/...` avec un jeton Bearer
#[derive(Debug, Clone)]
pub struct SpotifyApi {
    http: Client,
    base_url: String,
}

impl SpotifyApi {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Lit l'état du lecteur
    ///
    /// Retourne `None` quand Spotify répond 204 ou un corps vide : rien
    /// n'est en lecture, ce n'est pas une erreur.
    pub async fn currently_playing(&self, token: &str) -> Result<Option<RawCurrentlyPlaying>> {
        let url = format!("{}/me/player/currently-playing", self.base_url);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let response = check_status(response).await?;

        if response.status() == StatusCode::NO_CONTENT {
            debug!("Spotify player idle (204)");
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            debug!("Spotify player idle (empty body)");
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Profil du compte propriétaire du jeton
    pub async fn current_user(&self, token: &str) -> Result<RawUserProfile> {
        let url = format!("{}/me", self.base_url);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let body = check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    warn!("Spotify API error ({}): {}", status, message);

    if status == StatusCode::UNAUTHORIZED {
        Err(SpotifyError::Unauthorized)
    } else {
        Err(SpotifyError::Upstream {
            code: status.as_u16(),
            message,
        })
    }
}
