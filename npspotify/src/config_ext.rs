//! Extension pour intégrer la configuration Spotify dans npconfig
//!
//! ```yaml
//! spotify:
//!   client_id: "..."
//!   client_secret: "..."
//!   refresh_token: "..."
//!   redirect_uri: http://localhost:8080/api/spotify/callback
//!   allowed_user_id: "..."
//!   cache_ttl_secs: 10
//!   safety_margin_secs: 60
//!   request_timeout_secs: 8
//! ```
//!
//! Les secrets peuvent aussi venir de l'environnement
//! (`NPSITE_CONFIG__SPOTIFY__CLIENT_ID`, ...).

use npconfig::Config;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

const DEFAULT_CACHE_TTL_SECS: u64 = 10;
const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 8;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 7;

/// Paramètres résolus de la passerelle Spotify
///
/// Les secrets restent optionnels ici : leur absence n'est signalée qu'au
/// moment où un jeton est demandé.
#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub redirect_uri: Option<String>,
    pub allowed_user_id: Option<String>,
    pub accounts_base_url: String,
    pub api_base_url: String,
    pub cache_ttl_secs: u64,
    pub safety_margin_secs: u64,
    pub request_timeout: Duration,
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            redirect_uri: None,
            allowed_user_id: None,
            accounts_base_url: DEFAULT_ACCOUNTS_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Trait d'extension de `npconfig::Config` pour Spotify
pub trait SpotifyConfigExt {
    /// TTL du cache de snapshots, borné à moins de deux intervalles de poll
    fn get_spotify_cache_ttl_secs(&self) -> u64;

    /// Marge de sécurité appliquée à l'expiration des jetons
    fn get_spotify_safety_margin_secs(&self) -> u64;

    fn get_spotify_request_timeout(&self) -> Duration;

    /// Rassemble tous les paramètres Spotify
    fn get_spotify_settings(&self) -> SpotifySettings;
}

impl SpotifyConfigExt for Config {
    fn get_spotify_cache_ttl_secs(&self) -> u64 {
        let ttl = self.get_u64_or(&["spotify", "cache_ttl_secs"], DEFAULT_CACHE_TTL_SECS);
        let poll = self.get_u64_or(&["widget", "poll_interval_secs"], DEFAULT_POLL_INTERVAL_SECS);
        clamp_ttl(ttl, poll)
    }

    fn get_spotify_safety_margin_secs(&self) -> u64 {
        self.get_u64_or(&["spotify", "safety_margin_secs"], DEFAULT_SAFETY_MARGIN_SECS)
    }

    fn get_spotify_request_timeout(&self) -> Duration {
        let secs = self.get_u64_or(&["spotify", "request_timeout_secs"], DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs.max(1))
    }

    fn get_spotify_settings(&self) -> SpotifySettings {
        SpotifySettings {
            client_id: self.get_string(&["spotify", "client_id"]),
            client_secret: self.get_string(&["spotify", "client_secret"]),
            refresh_token: self.get_string(&["spotify", "refresh_token"]),
            redirect_uri: self.get_string(&["spotify", "redirect_uri"]),
            allowed_user_id: self.get_string(&["spotify", "allowed_user_id"]),
            accounts_base_url: self
                .get_string(&["spotify", "accounts_base_url"])
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_BASE_URL.to_string()),
            api_base_url: self
                .get_string(&["spotify", "api_base_url"])
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            cache_ttl_secs: self.get_spotify_cache_ttl_secs(),
            safety_margin_secs: self.get_spotify_safety_margin_secs(),
            request_timeout: self.get_spotify_request_timeout(),
        }
    }
}

/// Le TTL doit rester strictement inférieur à deux intervalles de poll
fn clamp_ttl(ttl: u64, poll_interval: u64) -> u64 {
    let ceiling = (poll_interval.max(1) * 2).saturating_sub(1).max(1);
    if ttl == 0 || ttl > ceiling {
        let fallback = ceiling.min(DEFAULT_CACHE_TTL_SECS);
        warn!(
            "spotify.cache_ttl_secs={} outside 1..={} for a {}s poll interval, using {}",
            ttl, ceiling, poll_interval, fallback
        );
        return fallback;
    }
    ttl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        let settings = config.get_spotify_settings();
        assert_eq!(settings.cache_ttl_secs, 10);
        assert_eq!(settings.safety_margin_secs, 60);
        assert_eq!(settings.request_timeout, Duration::from_secs(8));
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert!(settings.client_id.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_yaml_str(
            "spotify:\n  client_id: abc\n  api_base_url: http://127.0.0.1:9000/v1\n  cache_ttl_secs: 5\n",
        )
        .unwrap();
        let settings = config.get_spotify_settings();
        assert_eq!(settings.client_id.as_deref(), Some("abc"));
        assert_eq!(settings.api_base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(settings.cache_ttl_secs, 5);
    }

    #[test]
    fn test_ttl_stays_below_two_poll_intervals() {
        assert_eq!(clamp_ttl(10, 7), 10);
        assert_eq!(clamp_ttl(13, 7), 13);
        assert_eq!(clamp_ttl(14, 7), 10);
        assert_eq!(clamp_ttl(30, 3), 5);
        assert_eq!(clamp_ttl(0, 7), 10);
    }
}
