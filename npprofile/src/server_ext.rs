//! Extension npserver pour les endpoints de profil

use crate::api_rest::{DiscordState, GitHubState};
use anyhow::Result;

pub trait ProfileServerExt {
    /// Construit les clients depuis la configuration et enregistre les routes
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /api/discord` (Swagger UI sous `/swagger-ui/discord`)
    /// - `GET /api/github` (Swagger UI sous `/swagger-ui/github`)
    async fn init_profile(&mut self) -> Result<()>;

    async fn init_profile_with_state(&mut self, discord: DiscordState, github: GitHubState);
}
