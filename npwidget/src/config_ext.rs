//! Extension de configuration du widget
//!
//! ```yaml
//! widget:
//!   gateway_url: http://localhost:8080
//!   poll_interval_secs: 7
//!   idle_grace_ms: 1500
//!   exit_debounce_ms: 1000
//!   tick_ms: 16
//!   request_timeout_ms: 8000
//! ```

use crate::poller::PollerConfig;
use npconfig::Config;
use std::time::Duration;

const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 8000;

pub trait WidgetConfigExt {
    fn get_widget_gateway_url(&self) -> String;

    /// Délai maximal d'une requête vers la passerelle
    fn get_widget_request_timeout(&self) -> Duration;

    /// Constantes de temps du poller
    fn get_widget_poller_config(&self) -> PollerConfig;
}

impl WidgetConfigExt for Config {
    fn get_widget_gateway_url(&self) -> String {
        self.get_string(&["widget", "gateway_url"])
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string())
    }

    fn get_widget_request_timeout(&self) -> Duration {
        let millis = self.get_u64_or(&["widget", "request_timeout_ms"], DEFAULT_REQUEST_TIMEOUT_MS);
        Duration::from_millis(millis.max(1))
    }

    fn get_widget_poller_config(&self) -> PollerConfig {
        let defaults = PollerConfig::default();
        let millis = |key: &str, default: Duration| {
            Duration::from_millis(self.get_u64_or(&["widget", key], default.as_millis() as u64))
        };

        PollerConfig {
            poll_interval: Duration::from_secs(
                self.get_u64_or(&["widget", "poll_interval_secs"], defaults.poll_interval.as_secs())
                    .max(1),
            ),
            idle_grace: millis("idle_grace_ms", defaults.idle_grace),
            exit_debounce: millis("exit_debounce_ms", defaults.exit_debounce),
            tick: millis("tick_ms", defaults.tick).max(Duration::from_millis(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        let poller = config.get_widget_poller_config();
        assert_eq!(poller.poll_interval, Duration::from_secs(7));
        assert_eq!(poller.idle_grace, Duration::from_millis(1500));
        assert_eq!(poller.exit_debounce, Duration::from_millis(1000));
        assert_eq!(poller.tick, Duration::from_millis(16));
        assert_eq!(config.get_widget_gateway_url(), DEFAULT_GATEWAY_URL);
        assert_eq!(config.get_widget_request_timeout(), Duration::from_secs(8));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_yaml_str(
            "widget:\n  gateway_url: https://example.org\n  poll_interval_secs: 0\n  tick_ms: 50\n  request_timeout_ms: 2500\n",
        )
        .unwrap();
        let poller = config.get_widget_poller_config();
        assert_eq!(poller.poll_interval, Duration::from_secs(1));
        assert_eq!(poller.tick, Duration::from_millis(50));
        assert_eq!(config.get_widget_gateway_url(), "https://example.org");
        assert_eq!(config.get_widget_request_timeout(), Duration::from_millis(2500));
    }
}
