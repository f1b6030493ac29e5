//! Sources de snapshots

use async_trait::async_trait;
use npspotify::PlaybackSnapshot;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Échec d'un poll
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Now playing service unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Now playing service answered {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Unexpected now playing payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fournit le snapshot courant à chaque poll
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<PlaybackSnapshot>;
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: String,
}

/// Lit la passerelle HTTP (`GET <base>/now-playing`)
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: Client,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(gateway_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/now-playing", gateway_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<PlaybackSnapshot> {
        debug!("Polling {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorPayload>(&body)
                .map(|payload| payload.error)
                .unwrap_or(body);
            return Err(FetchError::Status {
                code: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
