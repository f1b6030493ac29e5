//! Vue publiée par le poller et rendu texte

use crate::progress::format_ms;
use crate::state::{DisplayState, PollerState};
use npspotify::Track;
use serde::Serialize;
use tokio::time::Instant;

pub const IDLE_MESSAGE: &str = "Not vibing to any music at the moment.";
pub const ERROR_MESSAGE: &str = "Can't reach Spotify right now";

/// Ce que l'interface doit afficher
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub display: DisplayState,
    pub track: Option<Track>,
    pub progress_ms: u64,
    pub stale: bool,
    pub error: Option<String>,
}

impl WidgetView {
    pub fn from_state(state: &PollerState, now: Instant) -> Self {
        Self {
            display: state.display,
            track: state.track.clone(),
            progress_ms: state.progress_at(now),
            stale: state.stale,
            error: state.error.clone(),
        }
    }
}

/// Une ligne de texte par état
pub fn render_line(view: &WidgetView) -> String {
    match (view.display, &view.track) {
        (DisplayState::Error, Some(track)) => format!(
            "⚠ {} (last seen: {} - {})",
            ERROR_MESSAGE,
            track.artist_line(),
            track.name
        ),
        (DisplayState::Error, None) => format!("⚠ {}", ERROR_MESSAGE),
        (DisplayState::Playing, Some(track)) => format!("▶ {}", track_line(track, view.progress_ms)),
        (DisplayState::Paused, Some(track)) => format!("⏸ {}", track_line(track, view.progress_ms)),
        _ => IDLE_MESSAGE.to_string(),
    }
}

fn track_line(track: &Track, progress_ms: u64) -> String {
    format!(
        "{} - {} [{} / {}]",
        track.artist_line(),
        track.name,
        format_ms(progress_ms),
        format_ms(track.duration_ms)
    )
}
