//! Extension de configuration pour Discord et GitHub
//!
//! ```yaml
//! discord:
//!   user_id: "123456789012345678"
//!   bot_token: "..."
//!   avatar_ttl_secs: 3600
//!
//! github:
//!   token: "..."
//!   login: adeptofficial
//!   repositories: 10
//!   cache_ttl_secs: 3600
//! ```

use npconfig::Config;
use std::time::Duration;

pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";
pub const DEFAULT_DISCORD_CDN_URL: &str = "https://cdn.discordapp.com";
pub const DEFAULT_GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const DEFAULT_TTL_SECS: u64 = 3600;
const DEFAULT_REPOSITORIES: u64 = 10;
const DEFAULT_GITHUB_LOGIN: &str = "adeptofficial";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DiscordSettings {
    pub user_id: Option<String>,
    pub bot_token: Option<String>,
    pub api_base_url: String,
    pub cdn_base_url: String,
    pub avatar_ttl_secs: u64,
    pub request_timeout: Duration,
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            user_id: None,
            bot_token: None,
            api_base_url: DEFAULT_DISCORD_API_URL.to_string(),
            cdn_base_url: DEFAULT_DISCORD_CDN_URL.to_string(),
            avatar_ttl_secs: DEFAULT_TTL_SECS,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub token: Option<String>,
    pub login: String,
    /// Nombre de dépôts récents affichés
    pub repositories: u32,
    pub cache_ttl_secs: u64,
    pub graphql_url: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            token: None,
            login: DEFAULT_GITHUB_LOGIN.to_string(),
            repositories: DEFAULT_REPOSITORIES as u32,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            graphql_url: DEFAULT_GITHUB_GRAPHQL_URL.to_string(),
            api_base_url: DEFAULT_GITHUB_API_URL.to_string(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

pub trait ProfileConfigExt {
    fn get_discord_settings(&self) -> DiscordSettings;
    fn get_github_settings(&self) -> GitHubSettings;
}

impl ProfileConfigExt for Config {
    fn get_discord_settings(&self) -> DiscordSettings {
        let defaults = DiscordSettings::default();
        DiscordSettings {
            user_id: self.get_string(&["discord", "user_id"]),
            bot_token: self.get_string(&["discord", "bot_token"]),
            api_base_url: self
                .get_string(&["discord", "api_base_url"])
                .unwrap_or(defaults.api_base_url),
            cdn_base_url: self
                .get_string(&["discord", "cdn_base_url"])
                .unwrap_or(defaults.cdn_base_url),
            avatar_ttl_secs: self.get_u64_or(&["discord", "avatar_ttl_secs"], DEFAULT_TTL_SECS),
            request_timeout: defaults.request_timeout,
        }
    }

    fn get_github_settings(&self) -> GitHubSettings {
        let defaults = GitHubSettings::default();
        let repositories = self
            .get_u64_or(&["github", "repositories"], DEFAULT_REPOSITORIES)
            .clamp(1, 100);

        GitHubSettings {
            token: self.get_string(&["github", "token"]),
            login: self.get_string(&["github", "login"]).unwrap_or(defaults.login),
            repositories: repositories as u32,
            cache_ttl_secs: self.get_u64_or(&["github", "cache_ttl_secs"], DEFAULT_TTL_SECS),
            graphql_url: self
                .get_string(&["github", "graphql_url"])
                .unwrap_or(defaults.graphql_url),
            api_base_url: self
                .get_string(&["github", "api_base_url"])
                .unwrap_or(defaults.api_base_url),
            request_timeout: defaults.request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("").unwrap();

        let discord = config.get_discord_settings();
        assert_eq!(discord.api_base_url, DEFAULT_DISCORD_API_URL);
        assert_eq!(discord.avatar_ttl_secs, 3600);
        assert!(discord.bot_token.is_none());

        let github = config.get_github_settings();
        assert_eq!(github.repositories, 10);
        assert_eq!(github.cache_ttl_secs, 3600);
        assert!(github.token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_yaml_str(
            "github:\n  login: octocat\n  repositories: 500\n  token: ghp\ndiscord:\n  user_id: '42'\n",
        )
        .unwrap();

        let github = config.get_github_settings();
        assert_eq!(github.login, "octocat");
        assert_eq!(github.repositories, 100);
        assert_eq!(github.token.as_deref(), Some("ghp"));
        assert_eq!(config.get_discord_settings().user_id.as_deref(), Some("42"));
    }
}
