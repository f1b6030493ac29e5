//! # npprofile - Endpoints de profil du site
//!
//! Deux ressources lues chez des tiers et servies en cache-aside :
//!
//! - l'avatar Discord du propriétaire (`GET /api/discord`)
//! - ses dépôts GitHub récents et leurs sites publiés (`GET /api/github`)
//!
//! Les deux endpoints sont protégés par un limiteur de débit par client.

pub mod api_rest;
pub mod config_ext;
pub mod discord;
pub mod error;
pub mod github;
pub mod server_ext;
mod server_impl;

pub use api_rest::{
    DiscordApiDoc, DiscordState, GitHubApiDoc, GitHubState, client_ip, create_discord_router,
    create_github_router,
};
pub use config_ext::{DiscordSettings, GitHubSettings, ProfileConfigExt};
pub use discord::{DiscordClient, DiscordUser, avatar_url_for};
pub use error::{ProfileError, Result};
pub use github::{GitHubClient, Pages, PagesStatus, Repository};
pub use server_ext::ProfileServerExt;
