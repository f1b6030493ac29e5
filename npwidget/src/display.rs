//! Anti-scintillement de l'affichage
//!
//! L'état logique peut basculer vers `Idle` le temps d'un poll manqué. Le
//! [`DisplayDebouncer`] retarde donc :
//!
//! - l'entrée en `Idle` d'une période de grâce (`idle_grace`)
//! - la sortie d'`Idle` vers un morceau d'un court délai (`exit_debounce`)
//!
//! Les autres changements sont immédiats, `Error` compris même depuis `Idle`.

use crate::state::DisplayState;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Pending {
    target: DisplayState,
    due: Instant,
}

#[derive(Debug, Clone)]
pub struct DisplayDebouncer {
    idle_grace: Duration,
    exit_debounce: Duration,
    shown: DisplayState,
    pending: Option<Pending>,
    observed: bool,
}

/// Résultat d'une observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// L'affichage adopte l'état logique tout de suite
    Apply,
    /// L'affichage garde l'état courant jusqu'à l'instant donné
    Defer(Instant),
}

impl DisplayDebouncer {
    pub fn new(idle_grace: Duration, exit_debounce: Duration) -> Self {
        Self {
            idle_grace,
            exit_debounce,
            shown: DisplayState::Idle,
            pending: None,
            observed: false,
        }
    }

    /// État actuellement affiché
    pub fn shown(&self) -> DisplayState {
        self.shown
    }

    /// Échéance d'un changement différé
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.due)
    }

    /// Enregistre un nouvel état logique
    pub fn observe(&mut self, logical: DisplayState, now: Instant) -> Decision {
        // Le premier état connu s'affiche sans délai
        if !self.observed {
            self.observed = true;
            self.shown = logical;
            self.pending = None;
            return Decision::Apply;
        }

        if logical == self.shown {
            self.pending = None;
            // Même état, contenu potentiellement nouveau (autre morceau)
            return Decision::Apply;
        }

        let delay = if logical == DisplayState::Idle {
            self.idle_grace
        } else if self.shown == DisplayState::Idle && logical != DisplayState::Error {
            self.exit_debounce
        } else {
            self.shown = logical;
            self.pending = None;
            return Decision::Apply;
        };

        let due = match self.pending {
            // Un changement de même nature est déjà en attente : on garde son échéance
            Some(p) if (p.target == DisplayState::Idle) == (logical == DisplayState::Idle) => p.due,
            _ => now + delay,
        };

        if due <= now {
            self.shown = logical;
            self.pending = None;
            return Decision::Apply;
        }

        self.pending = Some(Pending {
            target: logical,
            due,
        });
        Decision::Defer(due)
    }

    /// Applique le changement différé s'il est échu
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(p) if p.due <= now => {
                self.shown = p.target;
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
