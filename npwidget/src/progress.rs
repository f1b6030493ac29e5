//! Extrapolation locale de la progression entre deux polls

use tokio::time::Instant;

/// Point de référence de la progression
///
/// Équivaut à `anchorTime = arrivée - progressMs` : la progression locale
/// vaut `offset_ms + (now - at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressAnchor {
    pub at: Instant,
    pub offset_ms: u64,
}

impl ProgressAnchor {
    pub fn new(arrived_at: Instant, progress_ms: u64) -> Self {
        Self {
            at: arrived_at,
            offset_ms: progress_ms,
        }
    }
}

/// Progression locale, bornée par la durée du morceau
///
/// Non décroissante en `now` pour une ancre donnée.
pub fn local_progress(anchor: &ProgressAnchor, duration_ms: u64, now: Instant) -> u64 {
    let elapsed = now.saturating_duration_since(anchor.at).as_millis() as u64;
    anchor.offset_ms.saturating_add(elapsed).min(duration_ms)
}

/// `m:ss`
pub fn format_ms(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_extrapolates_from_anchor() {
        let t = Instant::now();
        let anchor = ProgressAnchor::new(t, 30_000);
        assert_eq!(local_progress(&anchor, 200_000, t), 30_000);
        assert_eq!(local_progress(&anchor, 200_000, t + Duration::from_millis(7_000)), 37_000);
    }

    #[test]
    fn test_clamped_and_monotonic() {
        let t = Instant::now();
        let anchor = ProgressAnchor::new(t, 195_000);
        let mut last = 0;
        for step in 0..200 {
            let p = local_progress(&anchor, 200_000, t + Duration::from_millis(step * 50));
            assert!(p >= last);
            assert!(p <= 200_000);
            last = p;
        }
        assert_eq!(last, 200_000);
    }

    #[test]
    fn test_before_anchor_does_not_go_backwards() {
        let t = Instant::now() + Duration::from_secs(1);
        let anchor = ProgressAnchor::new(t, 10_000);
        assert_eq!(local_progress(&anchor, 200_000, Instant::now()), 10_000);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_ms(0), "0:00");
        assert_eq!(format_ms(37_500), "0:37");
        assert_eq!(format_ms(200_000), "3:20");
    }
}
