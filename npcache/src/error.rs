//! Gestion des erreurs du cache

use thiserror::Error;

/// Type Result personnalisé pour npcache
pub type Result<T> = std::result::Result<T, CacheError>;

/// Erreurs possibles lors de l'accès au store clé-valeur
#[derive(Error, Debug)]
pub enum CacheError {
    /// Erreur HTTP vers le store distant
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de (dé)sérialisation JSON
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Le store distant a répondu par une erreur
    #[error("Key-value store error: {0}")]
    Remote(String),

    /// `INCR` sur une valeur non numérique
    #[error("Value at key {0} is not an integer")]
    NotAnInteger(String),
}
