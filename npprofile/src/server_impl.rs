//! Implémentation de [`ProfileServerExt`] pour `npserver::Server`

use crate::api_rest::{
    DiscordApiDoc, DiscordState, GitHubApiDoc, GitHubState, create_discord_router,
    create_github_router,
};
use crate::config_ext::ProfileConfigExt;
use crate::discord::DiscordClient;
use crate::github::GitHubClient;
use crate::server_ext::ProfileServerExt;
use anyhow::Result;
use npcache::{
    CacheConfigExt, RateLimiter, SharedClock, SystemClock, TieredCache, kv_store_from_config,
    remote_store_from_config,
};
use npserver::Server;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

const RATE_LIMIT_WINDOW_SECS: u64 = 60;
const RATE_LIMIT_MAX: u32 = 5;
const DISCORD_DEV_RATE_LIMIT_MAX: u32 = 50;

impl ProfileServerExt for Server {
    async fn init_profile(&mut self) -> Result<()> {
        info!("Initializing profile endpoints from configuration");

        let config = npconfig::get_config();
        let development = config.get_environment().is_development();
        let prefix = config.get_kv_prefix();
        let clock: SharedClock = Arc::new(SystemClock);
        let remote = remote_store_from_config(&config);
        let counters = kv_store_from_config(&config, clock.clone());

        let discord_settings = config.get_discord_settings();
        let avatar_cache = TieredCache::builder(format!("{}:discord_avatar", prefix))
            .ttl_secs(discord_settings.avatar_ttl_secs)
            .max_capacity(16)
            .maybe_remote(remote.clone())
            .clock(clock.clone())
            .build();
        let discord_max = if development {
            DISCORD_DEV_RATE_LIMIT_MAX
        } else {
            RATE_LIMIT_MAX
        };
        let discord = DiscordState {
            client: Arc::new(DiscordClient::new(discord_settings, avatar_cache)?),
            limiter: RateLimiter::new(
                counters.clone(),
                format!("{}:rate_limit:discord", prefix),
                discord_max,
                RATE_LIMIT_WINDOW_SECS,
            ),
            development,
        };

        let github_settings = config.get_github_settings();
        let repositories_cache = TieredCache::builder(format!("{}:github", prefix))
            .ttl_secs(github_settings.cache_ttl_secs)
            .max_capacity(16)
            .maybe_remote(remote)
            .clock(clock)
            .build();
        // Pas de limite en développement
        let github_limiter = (!development).then(|| {
            RateLimiter::new(
                counters,
                format!("{}:rate_limit:github", prefix),
                RATE_LIMIT_MAX,
                RATE_LIMIT_WINDOW_SECS,
            )
        });
        let github = GitHubState {
            client: Arc::new(GitHubClient::new(github_settings, repositories_cache)?),
            limiter: github_limiter,
            development,
        };

        self.init_profile_with_state(discord, github).await;
        Ok(())
    }

    async fn init_profile_with_state(&mut self, discord: DiscordState, github: GitHubState) {
        self.add_openapi(create_discord_router(discord), DiscordApiDoc::openapi(), "discord")
            .await;
        self.add_openapi(create_github_router(github), GitHubApiDoc::openapi(), "github")
            .await;
        info!("Profile endpoints available at /api/discord and /api/github");
    }
}
