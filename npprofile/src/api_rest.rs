//! Endpoints API REST du profil
//!
//! - `GET /api/discord` : `{profilePicUrl}`
//! - `GET /api/github` : dépôts récents avec leur site publié
//!
//! Chaque client est identifié par la première entrée de `x-forwarded-for`.

use crate::discord::DiscordClient;
use crate::error::ProfileError;
use crate::github::{GitHubClient, Pages, PagesStatus, Repository};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use npcache::RateLimiter;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};

const TOO_MANY_REQUESTS: &str = "Too many requests. Please try again later.";

#[derive(Clone)]
pub struct DiscordState {
    pub client: Arc<DiscordClient>,
    pub limiter: RateLimiter,
    pub development: bool,
}

#[derive(Clone)]
pub struct GitHubState {
    pub client: Arc<GitHubClient>,
    /// `None` : pas de limite (développement)
    pub limiter: Option<RateLimiter>,
    pub development: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub profile_pic_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn error_response(status: StatusCode, message: &str, details: Option<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
            details,
        }),
    )
        .into_response()
}

fn profile_error(err: ProfileError, service: &str, development: bool) -> Response {
    if err.is_config_error() {
        warn!("{} endpoint called but not configured: {}", service, err);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("{} is not configured", service),
            development.then(|| err.to_string()),
        );
    }

    warn!("{} request failed: {}", service, err);
    error_response(
        StatusCode::BAD_GATEWAY,
        &format!("Failed to fetch data from {}", service),
        development.then(|| err.to_string()),
    )
}

/// Première adresse de `x-forwarded-for`, `unknown` sinon
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Un store de compteurs indisponible laisse passer la requête
async fn is_limited(limiter: &RateLimiter, client: &str) -> bool {
    match limiter.is_limited(client).await {
        Ok(limited) => limited,
        Err(e) => {
            warn!("Rate limiter unavailable, request allowed: {}", e);
            false
        }
    }
}

/// Avatar Discord du propriétaire du site
#[utoipa::path(
    get,
    path = "/api/discord",
    responses(
        (status = 200, description = "Avatar URL", body = AvatarResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Discord is not configured", body = ErrorBody),
        (status = 502, description = "Discord API failure", body = ErrorBody)
    ),
    tag = "discord"
)]
pub async fn discord_avatar(State(state): State<DiscordState>, headers: HeaderMap) -> Response {
    let ip = client_ip(&headers);
    if is_limited(&state.limiter, &ip).await {
        return error_response(StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS, None);
    }

    match state.client.avatar_url().await {
        Ok(profile_pic_url) => Json(AvatarResponse { profile_pic_url }).into_response(),
        Err(e) => profile_error(e, "Discord", state.development),
    }
}

/// Dépôts GitHub récents
#[utoipa::path(
    get,
    path = "/api/github",
    responses(
        (status = 200, description = "Most recently created repositories", body = Vec<Repository>),
        (status = 429, description = "Rate limit exceeded and nothing cached", body = ErrorBody),
        (status = 500, description = "GitHub is not configured", body = ErrorBody),
        (status = 502, description = "GitHub API failure", body = ErrorBody)
    ),
    tag = "github"
)]
pub async fn github_repositories(State(state): State<GitHubState>, headers: HeaderMap) -> Response {
    if !state.client.is_configured() {
        return profile_error(
            ProfileError::MissingConfig("github.token"),
            "GitHub",
            state.development,
        );
    }

    if let Some(limiter) = &state.limiter {
        let ip = client_ip(&headers);
        if is_limited(limiter, &ip).await {
            // Au-delà de la limite, le cache reste servi
            return match state.client.cached().await {
                Some(repositories) => Json(repositories).into_response(),
                None => error_response(StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS, None),
            };
        }
    }

    match state.client.repositories().await {
        Ok(repositories) => Json(repositories).into_response(),
        Err(e) => profile_error(e, "GitHub", state.development),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(discord_avatar),
    components(schemas(AvatarResponse, ErrorBody)),
    tags((name = "discord", description = "Discord profile picture"))
)]
pub struct DiscordApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(github_repositories),
    components(schemas(Repository, Pages, PagesStatus, ErrorBody)),
    tags((name = "github", description = "GitHub repository showcase"))
)]
pub struct GitHubApiDoc;

/// Router monté sous `/api/discord`
pub fn create_discord_router(state: DiscordState) -> Router {
    Router::new()
        .route("/", get(discord_avatar))
        .with_state(state)
}

/// Router monté sous `/api/github`
pub fn create_github_router(state: GitHubState) -> Router {
    Router::new()
        .route("/", get(github_repositories))
        .with_state(state)
}
