//! Endpoints API REST pour Spotify
//!
//! - `GET /api/spotify/now-playing` : snapshot courant (alias `GET /now-playing`)
//! - `GET /api/spotify/callback?code=...` : échange OAuth initial
//!
//! Toutes les réponses portent `Cache-Control: no-store`.

use crate::error::{GatewayErrorKind, SpotifyError};
use crate::gateway::NowPlayingGateway;
use crate::models::{PlaybackSnapshot, Track};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

/// État partagé des handlers Spotify
#[derive(Clone)]
pub struct SpotifyState {
    pub gateway: Arc<NowPlayingGateway>,
    /// Expose le détail des erreurs (environnement de développement)
    pub development: bool,
}

impl SpotifyState {
    pub fn new(gateway: Arc<NowPlayingGateway>, development: bool) -> Self {
        Self {
            gateway,
            development,
        }
    }
}

/// Corps des réponses d'erreur
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<GatewayErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Réponse du callback OAuth
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub message: String,
    pub user_id: String,
    pub display_name: Option<String>,
    /// À recopier dans `spotify.refresh_token`
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

// ============ Gestion des erreurs ============

struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn from_spotify(err: SpotifyError, development: bool) -> Self {
        let (status, message) = match &err {
            SpotifyError::MissingConfig(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Spotify credentials are not configured",
            ),
            SpotifyError::Unauthorized | SpotifyError::CredentialRejected(_) => (
                StatusCode::UNAUTHORIZED,
                "Access token expired or unauthorized",
            ),
            _ => (StatusCode::BAD_GATEWAY, "Failed to fetch data from Spotify"),
        };

        Self {
            status,
            body: ErrorBody {
                error: message.to_string(),
                kind: Some(err.kind()),
                details: development.then(|| err.to_string()),
            },
        }
    }

    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: message.to_string(),
                kind: None,
                details: None,
            },
        }
    }

    fn forbidden(message: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            body: ErrorBody {
                error: message.to_string(),
                kind: None,
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        no_store((self.status, Json(self.body)))
    }
}

fn no_store(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

// ============ Handlers ============

/// Snapshot de lecture courant
#[utoipa::path(
    get,
    path = "/now-playing",
    responses(
        (status = 200, description = "Current playback, or the not-playing payload", body = PlaybackSnapshot),
        (status = 401, description = "Access token expired or unauthorized", body = ErrorBody),
        (status = 500, description = "Spotify is not configured", body = ErrorBody),
        (status = 502, description = "Spotify API failure", body = ErrorBody)
    ),
    tag = "spotify"
)]
pub async fn now_playing(State(state): State<SpotifyState>) -> Response {
    match state.gateway.get_now_playing().await {
        Ok(snapshot) => no_store(Json(snapshot)),
        Err(e) => ApiError::from_spotify(e, state.development).into_response(),
    }
}

/// Échange d'un code d'autorisation OAuth
#[utoipa::path(
    get,
    path = "/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code returned by Spotify")
    ),
    responses(
        (status = 200, description = "Tokens obtained", body = CallbackResponse),
        (status = 400, description = "Missing authorization code", body = ErrorBody),
        (status = 401, description = "Code rejected", body = ErrorBody),
        (status = 403, description = "Account is not the site owner", body = ErrorBody)
    ),
    tag = "spotify"
)]
pub async fn callback(
    State(state): State<SpotifyState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error {
        warn!("Spotify authorization denied: {}", error);
        return ApiError::bad_request("Authorization was denied").into_response();
    }
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return ApiError::bad_request("Missing authorization code").into_response();
    };

    match exchange(&state, &code).await {
        Ok(body) => no_store(Json(body)),
        Err(e) => e.into_response(),
    }
}

async fn exchange(state: &SpotifyState, code: &str) -> Result<CallbackResponse, ApiError> {
    let settings = state.gateway.settings();
    let redirect_uri = settings.redirect_uri.clone().ok_or_else(|| {
        ApiError::from_spotify(
            SpotifyError::MissingConfig("spotify.redirect_uri".into()),
            state.development,
        )
    })?;

    let tokens = state
        .gateway
        .credentials()
        .exchange_code(code, &redirect_uri)
        .await
        .map_err(|e| ApiError::from_spotify(e, state.development))?;

    let profile = state
        .gateway
        .api()
        .current_user(&tokens.access_token)
        .await
        .map_err(|e| ApiError::from_spotify(e, state.development))?;

    if let Some(allowed) = &settings.allowed_user_id {
        if !state.development && &profile.id != allowed {
            warn!("Spotify authorization attempt by foreign account {}", profile.id);
            return Err(ApiError::forbidden(
                "Access denied: only the site owner may authorize Spotify",
            ));
        }
    }

    state.gateway.credentials().adopt(&tokens).await;
    // Le snapshot en cache peut venir des anciens jetons
    state.gateway.invalidate().await;

    info!(
        "Spotify authorized for {}",
        profile.display_name.as_deref().unwrap_or(&profile.id)
    );

    Ok(CallbackResponse {
        message: "Authenticated successfully".to_string(),
        user_id: profile.id,
        display_name: profile.display_name,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
    })
}

// ============ Router et documentation ============

#[derive(OpenApi)]
#[openapi(
    paths(now_playing, callback),
    components(schemas(PlaybackSnapshot, Track, ErrorBody, CallbackResponse, GatewayErrorKind)),
    tags(
        (name = "spotify", description = "Spotify now playing gateway")
    )
)]
pub struct SpotifyApiDoc;

/// Router monté sous `/api/spotify`
pub fn create_api_router(state: SpotifyState) -> Router {
    Router::new()
        .route("/now-playing", get(now_playing))
        .route("/callback", get(callback))
        .with_state(state)
}

/// Alias `GET /now-playing` à la racine du site
pub fn create_alias_router(state: SpotifyState) -> Router {
    Router::new()
        .route("/now-playing", get(now_playing))
        .with_state(state)
}
