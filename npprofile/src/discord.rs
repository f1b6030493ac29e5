//! Avatar Discord du propriétaire du site
//!
//! L'utilisateur est lu via `GET /users/{id}` avec le jeton du bot, puis
//! l'URL CDN de l'avatar est mise en cache (une heure par défaut).

use crate::config_ext::DiscordSettings;
use crate::error::{ProfileError, Result};
use npcache::TieredCache;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

/// Sous-ensemble de l'objet utilisateur Discord
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    /// Hash de l'avatar, absent pour l'avatar par défaut
    pub avatar: Option<String>,
}

/// URL CDN de l'avatar
///
/// Sans avatar personnalisé, Discord attribue l'un des six avatars par
/// défaut, choisi à partir de l'identifiant.
pub fn avatar_url_for(cdn_base_url: &str, user: &DiscordUser) -> String {
    let cdn = cdn_base_url.trim_end_matches('/');
    match &user.avatar {
        Some(hash) => format!("{}/avatars/{}/{}?size=2048", cdn, user.id, hash),
        None => {
            let index = user.id.parse::<u64>().map(|id| (id >> 22) % 6).unwrap_or(0);
            format!("{}/embed/avatars/{}.png", cdn, index)
        }
    }
}

pub struct DiscordClient {
    http: Client,
    settings: DiscordSettings,
    cache: TieredCache<String>,
}

impl DiscordClient {
    pub fn new(settings: DiscordSettings, cache: TieredCache<String>) -> Result<Self> {
        let http = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self {
            http,
            settings,
            cache,
        })
    }

    pub fn settings(&self) -> &DiscordSettings {
        &self.settings
    }

    /// URL de l'avatar, depuis le cache si possible
    pub async fn avatar_url(&self) -> Result<String> {
        let user_id = self
            .settings
            .user_id
            .as_deref()
            .ok_or(ProfileError::MissingConfig("discord.user_id"))?;
        let token = self
            .settings
            .bot_token
            .as_deref()
            .ok_or(ProfileError::MissingConfig("discord.bot_token"))?;

        if let Some(url) = self.cache.get(user_id).await {
            debug!("Discord avatar served from cache");
            return Ok(url);
        }

        let user = self.fetch_user(user_id, token).await?;
        let url = avatar_url_for(&self.settings.cdn_base_url, &user);
        self.cache.put(user_id, url.clone()).await;

        info!("Discord avatar refreshed for {}", user.id);
        Ok(url)
    }

    async fn fetch_user(&self, user_id: &str, token: &str) -> Result<DiscordUser> {
        let url = format!(
            "{}/users/{}",
            self.settings.api_base_url.trim_end_matches('/'),
            user_id
        );
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProfileError::Upstream {
                service: "Discord",
                code: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_url_with_hash() {
        let user = DiscordUser {
            id: "80351110224678912".into(),
            avatar: Some("8342729096ea3675442027381ff50dfe".into()),
        };
        assert_eq!(
            avatar_url_for("https://cdn.discordapp.com/", &user),
            "https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe?size=2048"
        );
    }

    #[test]
    fn test_default_avatar_when_none() {
        let user = DiscordUser {
            id: "80351110224678912".into(),
            avatar: None,
        };
        let index = (80351110224678912u64 >> 22) % 6;
        assert_eq!(
            avatar_url_for("https://cdn.discordapp.com", &user),
            format!("https://cdn.discordapp.com/embed/avatars/{}.png", index)
        );
    }
}
