//! Types d'erreurs pour les endpoints de profil

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProfileError>;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("{service} API error {code}: {message}")]
    Upstream {
        service: &'static str,
        code: u16,
        message: String,
    },

    #[error("GraphQL query failed: {0}")]
    GraphQl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ProfileError {
    pub fn is_config_error(&self) -> bool {
        matches!(self, ProfileError::MissingConfig(_))
    }
}
