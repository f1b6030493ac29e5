//! Modèles de données Spotify
//!
//! Les structures `Raw*` reflètent les réponses de l'API Web Spotify et ne
//! retiennent que les champs utiles ; tout le reste est ignoré à la
//! désérialisation. [`normalize`] les réduit à un [`PlaybackSnapshot`].

use crate::error::{Result, SpotifyError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Morceau en cours de lecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    /// Durée en millisecondes, toujours > 0
    pub duration_ms: u64,
    pub album_art_url: Option<String>,
    pub external_url: String,
}

impl Track {
    /// Artistes joints par une virgule
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// Lecture normalisée de l'état du lecteur à un instant donné
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub progress_ms: u64,
    pub track: Option<Track>,
    /// Instant de capture côté serveur (millisecondes epoch)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[cfg_attr(feature = "server", schema(value_type = i64))]
    pub fetched_at: DateTime<Utc>,
}

impl PlaybackSnapshot {
    /// Réponse canonique « rien en lecture »
    pub fn not_playing(fetched_at: DateTime<Utc>) -> Self {
        Self {
            is_playing: false,
            progress_ms: 0,
            track: None,
            fetched_at,
        }
    }
}

// ============ Payloads Spotify ============

#[derive(Debug, Clone, Deserialize)]
pub struct RawImage {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawArtist {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAlbum {
    #[serde(default)]
    pub images: Vec<RawImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExternalUrls {
    pub spotify: Option<String>,
}

/// Élément joué (piste ou épisode)
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    pub id: Option<String>,
    pub uri: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
    pub duration_ms: u64,
    pub album: Option<RawAlbum>,
    /// Pochette des épisodes de podcast
    #[serde(default)]
    pub images: Vec<RawImage>,
    #[serde(default)]
    pub external_urls: RawExternalUrls,
}

/// Réponse de `GET /me/player/currently-playing`
#[derive(Debug, Clone, Deserialize)]
pub struct RawCurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub item: Option<RawItem>,
}

/// Réponse du endpoint `/api/token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    /// Présent quand Spotify fait tourner le refresh token
    pub refresh_token: Option<String>,
}

/// Réponse de `GET /me`
#[derive(Debug, Clone, Deserialize)]
pub struct RawUserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// Réduit une réponse Spotify à un [`PlaybackSnapshot`]
///
/// Fonction pure : deux appels sur le même payload et le même instant
/// donnent des valeurs identiques.
pub fn normalize(raw: &RawCurrentlyPlaying, fetched_at: DateTime<Utc>) -> Result<PlaybackSnapshot> {
    let Some(item) = &raw.item else {
        return Ok(PlaybackSnapshot::not_playing(fetched_at));
    };

    if item.duration_ms == 0 {
        return Err(SpotifyError::Parse(format!(
            "item {} has a zero duration",
            item.name
        )));
    }

    let id = item
        .id
        .clone()
        .or_else(|| item.uri.clone())
        .ok_or_else(|| SpotifyError::Parse(format!("item {} has no id", item.name)))?;

    let album_art_url = item
        .album
        .as_ref()
        .and_then(|album| album.images.first())
        .or_else(|| item.images.first())
        .map(|image| image.url.clone());

    let external_url = item
        .external_urls
        .spotify
        .clone()
        .unwrap_or_else(|| format!("https://open.spotify.com/track/{}", id));

    let track = Track {
        id,
        name: item.name.clone(),
        artists: item.artists.iter().map(|a| a.name.clone()).collect(),
        duration_ms: item.duration_ms,
        album_art_url,
        external_url,
    };

    Ok(PlaybackSnapshot {
        is_playing: raw.is_playing,
        progress_ms: raw.progress_ms.unwrap_or(0).min(track.duration_ms),
        track: Some(track),
        fetched_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_payload() -> serde_json::Value {
        json!({
            "timestamp": 1714564800000u64,
            "context": { "type": "playlist" },
            "progress_ms": 30000,
            "is_playing": true,
            "currently_playing_type": "track",
            "item": {
                "id": "4uLU6hMCjMI75M1A2tKUQC",
                "uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
                "name": "Never Gonna Give You Up",
                "duration_ms": 200000,
                "popularity": 80,
                "artists": [{ "name": "Rick Astley", "id": "0gxyHStUsqpMadRV0Di1Qt" }],
                "album": {
                    "name": "Whenever You Need Somebody",
                    "images": [
                        { "url": "https://i.scdn.co/image/large", "width": 640 },
                        { "url": "https://i.scdn.co/image/small", "width": 64 }
                    ]
                },
                "external_urls": { "spotify": "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC" }
            }
        })
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_normalize_keeps_only_known_fields() {
        let raw: RawCurrentlyPlaying = serde_json::from_value(sample_payload()).unwrap();
        let snapshot = normalize(&raw, at()).unwrap();

        assert!(snapshot.is_playing);
        assert_eq!(snapshot.progress_ms, 30000);
        let track = snapshot.track.unwrap();
        assert_eq!(track.artists, vec!["Rick Astley".to_string()]);
        assert_eq!(track.album_art_url.as_deref(), Some("https://i.scdn.co/image/large"));
        assert_eq!(
            track.external_url,
            "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw: RawCurrentlyPlaying = serde_json::from_value(sample_payload()).unwrap();
        let first = serde_json::to_vec(&normalize(&raw, at()).unwrap()).unwrap();
        let second = serde_json::to_vec(&normalize(&raw, at()).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_progress_is_clamped_to_duration() {
        let mut payload = sample_payload();
        payload["progress_ms"] = json!(250000);
        let raw: RawCurrentlyPlaying = serde_json::from_value(payload).unwrap();
        assert_eq!(normalize(&raw, at()).unwrap().progress_ms, 200000);
    }

    #[test]
    fn test_null_item_is_not_playing() {
        let raw: RawCurrentlyPlaying =
            serde_json::from_value(json!({ "is_playing": true, "item": null })).unwrap();
        assert_eq!(normalize(&raw, at()).unwrap(), PlaybackSnapshot::not_playing(at()));
    }

    #[test]
    fn test_zero_duration_is_a_parse_error() {
        let mut payload = sample_payload();
        payload["item"]["duration_ms"] = json!(0);
        let raw: RawCurrentlyPlaying = serde_json::from_value(payload).unwrap();
        assert!(matches!(normalize(&raw, at()), Err(SpotifyError::Parse(_))));
    }

    #[test]
    fn test_snapshot_wire_format() {
        let json = serde_json::to_value(PlaybackSnapshot::not_playing(at())).unwrap();
        assert_eq!(
            json,
            json!({
                "isPlaying": false,
                "progressMs": 0,
                "track": null,
                "fetchedAt": 1714564800000i64
            })
        );
    }
}
