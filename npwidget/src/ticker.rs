//! Tâche d'animation de la progression
//!
//! Un [`ProgressTicker`] n'existe que pendant l'état `Playing`. Il met à jour
//! `progress_ms` dans la vue à chaque tick, sans aucune E/S. Il s'arrête dès
//! qu'il est abandonné.

use crate::progress::{ProgressAnchor, local_progress};
use crate::view::WidgetView;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct ProgressTicker {
    cancel: CancellationToken,
}

impl ProgressTicker {
    pub fn spawn(
        view: Arc<watch::Sender<WidgetView>>,
        anchor: ProgressAnchor,
        duration_ms: u64,
        every: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let progress = local_progress(&anchor, duration_ms, Instant::now());
                        view.send_if_modified(|v| {
                            // Une vue plus récente a pu être publiée entre-temps
                            if token.is_cancelled() || v.progress_ms == progress {
                                return false;
                            }
                            v.progress_ms = progress;
                            true
                        });
                        if progress >= duration_ms {
                            break;
                        }
                    }
                }
            }
        });

        Self { cancel }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
