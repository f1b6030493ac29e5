//! Boucle de polling du widget
//!
//! Une seule tâche de polling par [`Poller`]. Elle :
//!
//! - interroge la source toutes les `poll_interval` tant que le widget est visible
//! - repoll immédiatement au retour de la visibilité
//! - fait passer chaque résultat par [`transition`] puis par le [`DisplayDebouncer`]
//! - publie la vue dans un canal `watch`
//!
//! Un [`ProgressTicker`] anime la progression uniquement en `Playing`.

use crate::display::{Decision, DisplayDebouncer};
use crate::source::SnapshotSource;
use crate::state::{DisplayState, PollEvent, PollerState, transition};
use crate::ticker::ProgressTicker;
use crate::view::WidgetView;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub idle_grace: Duration,
    pub exit_debounce: Duration,
    /// Période d'animation de la progression
    pub tick: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(7),
            idle_grace: Duration::from_millis(1500),
            exit_debounce: Duration::from_millis(1000),
            tick: Duration::from_millis(16),
        }
    }
}

struct PollLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Widget « now playing » côté client
pub struct Poller {
    source: Arc<dyn SnapshotSource>,
    config: PollerConfig,
    view: Arc<watch::Sender<WidgetView>>,
    visible: Arc<watch::Sender<bool>>,
    running: Mutex<Option<PollLoop>>,
}

impl Poller {
    pub fn new(source: Arc<dyn SnapshotSource>, config: PollerConfig) -> Self {
        let (view, _) = watch::channel(WidgetView::default());
        let (visible, _) = watch::channel(true);
        Self {
            source,
            config,
            view: Arc::new(view),
            visible: Arc::new(visible),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Abonnement aux changements de vue
    pub fn subscribe(&self) -> watch::Receiver<WidgetView> {
        self.view.subscribe()
    }

    /// Vue courante
    pub fn view(&self) -> WidgetView {
        self.view.borrow().clone()
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    /// Démarre la boucle de polling
    ///
    /// Une boucle déjà active est annulée avant d'en lancer une nouvelle :
    /// il n'y a jamais deux timers de polling en parallèle.
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap();
        if let Some(previous) = running.take() {
            debug!("Restarting now playing poller");
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let task = PollTask {
            source: self.source.clone(),
            config: self.config.clone(),
            view: self.view.clone(),
            visible: self.visible.subscribe(),
        };
        let handle = tokio::spawn(task.run(cancel.clone()));

        info!(
            "Now playing poller started (every {:?})",
            self.config.poll_interval
        );
        *running = Some(PollLoop { cancel, handle });
    }

    /// Arrête la boucle sans attendre sa fin
    pub fn stop(&self) {
        if let Some(previous) = self.running.lock().unwrap().take() {
            previous.cancel.cancel();
            info!("Now playing poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|l| !l.handle.is_finished())
    }

    /// Suspend le polling quand le widget est masqué
    pub fn set_visible(&self, visible: bool) {
        self.visible.send_if_modified(|current| {
            if *current == visible {
                return false;
            }
            *current = visible;
            true
        });
    }

    /// Arrête la boucle et attend la fin de la tâche
    pub async fn shutdown(&self) {
        let running = self.running.lock().unwrap().take();
        if let Some(running) = running {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                warn!("Now playing poller task failed: {}", e);
            }
            info!("Now playing poller shut down");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            if let Some(running) = running.take() {
                running.cancel.cancel();
            }
        }
    }
}

struct PollTask {
    source: Arc<dyn SnapshotSource>,
    config: PollerConfig,
    view: Arc<watch::Sender<WidgetView>>,
    visible: watch::Receiver<bool>,
}

impl PollTask {
    async fn run(mut self, cancel: CancellationToken) {
        let mut logical = PollerState::default();
        let mut displayed = PollerState::default();
        let mut debouncer = DisplayDebouncer::new(self.config.idle_grace, self.config.exit_debounce);
        let mut ticker: Option<ProgressTicker> = None;

        let mut is_visible = *self.visible.borrow_and_update();
        let mut next_poll = Instant::now();

        loop {
            let deadline = debouncer.deadline();

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                changed = self.visible.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let now_visible = *self.visible.borrow_and_update();
                    if now_visible && !is_visible {
                        debug!("Widget visible again, polling now");
                        next_poll = Instant::now();
                    }
                    is_visible = now_visible;
                }

                _ = sleep_until(deadline.unwrap_or(next_poll)), if deadline.is_some() => {
                    if debouncer.fire_due(Instant::now()) {
                        displayed = logical.clone();
                        self.publish(&displayed, &mut ticker);
                    }
                }

                _ = sleep_until(next_poll), if is_visible => {
                    let event = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        result = self.source.fetch() => match result {
                            Ok(snapshot) => PollEvent::Snapshot {
                                snapshot,
                                arrived_at: Instant::now(),
                            },
                            Err(e) => {
                                warn!("Now playing poll failed: {}", e);
                                PollEvent::Failed {
                                    message: e.to_string(),
                                    at: Instant::now(),
                                }
                            }
                        },
                    };

                    logical = transition(&logical, event);
                    let now = Instant::now();
                    match debouncer.observe(logical.display, now) {
                        Decision::Apply => {
                            displayed = logical.clone();
                            self.publish(&displayed, &mut ticker);
                        }
                        Decision::Defer(due) => {
                            debug!("Display change to {:?} deferred until {:?}", logical.display, due);
                        }
                    }
                    next_poll = now + self.config.poll_interval;
                }
            }
        }

        drop(ticker);
        debug!("Now playing poll loop exited");
    }

    /// Publie l'état affiché et (re)lance l'animation si nécessaire
    fn publish(&self, displayed: &PollerState, ticker: &mut Option<ProgressTicker>) {
        // L'ancien ticker s'arrête avant que la nouvelle vue ne parte
        drop(ticker.take());

        let now = Instant::now();
        self.view.send_replace(WidgetView::from_state(displayed, now));

        if displayed.display == DisplayState::Playing {
            if let (Some(anchor), Some(track)) = (displayed.anchor, displayed.track.as_ref()) {
                *ticker = Some(ProgressTicker::spawn(
                    self.view.clone(),
                    anchor,
                    track.duration_ms,
                    self.config.tick,
                ));
            }
        }
    }
}
