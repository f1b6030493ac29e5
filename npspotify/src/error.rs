//! Gestion des erreurs pour la passerelle Spotify

use serde::Serialize;
use thiserror::Error;

/// Type Result personnalisé pour npspotify
pub type Result<T> = std::result::Result<T, SpotifyError>;

/// Catégorie stable d'une erreur, exposée dans les réponses HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// Jeton refusé par l'API (HTTP 401)
    Unauthorized,
    /// Secrets absents ou refresh token rejeté
    Credential,
    /// Réseau, timeout, statut non-2xx ou payload inattendu
    UpstreamFailure,
}

/// Erreurs possibles lors de l'accès à Spotify
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Secret ou paramètre absent de la configuration
    #[error("Spotify configuration missing: {0}")]
    MissingConfig(String),

    /// Le endpoint de token a refusé le refresh token ou le code
    #[error("Spotify token refresh rejected: {0}")]
    CredentialRejected(String),

    /// L'API a répondu 401 au jeton d'accès
    #[error("Access token expired or unauthorized")]
    Unauthorized,

    /// Statut non-2xx de l'API
    #[error("Spotify API error (code {code}): {message}")]
    Upstream { code: u16, message: String },

    /// Erreur réseau ou timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Payload de forme inattendue
    #[error("Unexpected Spotify payload: {0}")]
    Parse(String),
}

impl SpotifyError {
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::MissingConfig(_) | Self::CredentialRejected(_) => GatewayErrorKind::Credential,
            Self::Unauthorized => GatewayErrorKind::Unauthorized,
            Self::Upstream { .. } | Self::Http(_) | Self::Parse(_) => {
                GatewayErrorKind::UpstreamFailure
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

impl From<serde_json::Error> for SpotifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
