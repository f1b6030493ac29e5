//! Machine à états du widget
//!
//! [`transition`] est une fonction pure : (état précédent, événement) donne
//! le nouvel état. Toute la logique temporelle passe par l'instant porté par
//! l'événement.
//!
//! | événement                         | état suivant                  |
//! |-----------------------------------|-------------------------------|
//! | snapshot sans morceau             | `Idle`                        |
//! | morceau, `isPlaying = false`      | `Paused`                      |
//! | morceau, `isPlaying = true`       | `Playing` (ancre recalculée)  |
//! | échec de la requête               | `Error` (dernier morceau gardé, marqué périmé) |

use crate::progress::{ProgressAnchor, local_progress};
use npspotify::{PlaybackSnapshot, Track};
use serde::Serialize;
use tokio::time::Instant;

/// État de présentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    #[default]
    Idle,
    Paused,
    Playing,
    /// Distinct d'`Idle` : la passerelle est injoignable
    Error,
}

/// Entrée de la machine à états
#[derive(Debug, Clone)]
pub enum PollEvent {
    Snapshot {
        snapshot: PlaybackSnapshot,
        arrived_at: Instant,
    },
    Failed {
        message: String,
        at: Instant,
    },
}

/// État logique du widget
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollerState {
    pub display: DisplayState,
    pub track: Option<Track>,
    /// Présente uniquement en `Playing`
    pub anchor: Option<ProgressAnchor>,
    /// Progression figée (`Paused`, `Error`)
    pub frozen_progress_ms: u64,
    /// Le morceau affiché provient d'un poll antérieur à l'échec
    pub stale: bool,
    pub error: Option<String>,
}

impl PollerState {
    /// Progression affichable à `now`
    pub fn progress_at(&self, now: Instant) -> u64 {
        match (&self.anchor, &self.track) {
            (Some(anchor), Some(track)) => local_progress(anchor, track.duration_ms, now),
            _ => self.frozen_progress_ms,
        }
    }
}

pub fn transition(previous: &PollerState, event: PollEvent) -> PollerState {
    match event {
        PollEvent::Snapshot {
            snapshot,
            arrived_at,
        } => match snapshot.track {
            None => PollerState::default(),
            Some(track) if !snapshot.is_playing => PollerState {
                display: DisplayState::Paused,
                frozen_progress_ms: snapshot.progress_ms.min(track.duration_ms),
                track: Some(track),
                anchor: None,
                stale: false,
                error: None,
            },
            Some(track) => PollerState {
                display: DisplayState::Playing,
                anchor: Some(ProgressAnchor::new(arrived_at, snapshot.progress_ms)),
                frozen_progress_ms: 0,
                track: Some(track),
                stale: false,
                error: None,
            },
        },
        PollEvent::Failed { message, at } => PollerState {
            display: DisplayState::Error,
            frozen_progress_ms: previous.progress_at(at),
            stale: previous.track.is_some(),
            track: previous.track.clone(),
            anchor: None,
            error: Some(message),
        },
    }
}
