//! Progress accounting between batches.

use std::time::Instant;

use super::types::SyncProgress;

/// Tracks completed items and derives speed and ETA from the items finished
/// since the previous emission.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    current: usize,
    last_emit: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize, already_done: usize) -> Self {
        Self { total, current: already_done.min(total), last_emit: Instant::now() }
    }

    /// Snapshot without rate information.
    pub fn snapshot(&self) -> SyncProgress {
        SyncProgress {
            current: self.current,
            total: self.total,
            percentage: percentage(self.current, self.total),
            speed_items_per_sec: None,
            eta_seconds: None,
        }
    }

    /// Record `completed` more items and emit a snapshot.
    pub fn advance(&mut self, completed: usize) -> SyncProgress {
        self.advance_at(completed, Instant::now())
    }

    pub(crate) fn advance_at(&mut self, completed: usize, now: Instant) -> SyncProgress {
        let elapsed = now.saturating_duration_since(self.last_emit).as_secs_f64();
        self.last_emit = now;
        self.current = (self.current + completed).min(self.total);

        let speed = (completed > 0 && elapsed > 0.0).then(|| completed as f64 / elapsed);
        let remaining = self.total - self.current;
        let eta = speed.map(|speed| (remaining as f64 / speed).ceil() as u64);

        SyncProgress { speed_items_per_sec: speed, eta_seconds: eta, ..self.snapshot() }
    }
}

fn percentage(current: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (current as f64 * 1000.0 / total as f64).round() / 10.0
}
