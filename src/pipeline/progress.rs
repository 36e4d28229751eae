//! Run progress: completed/total, throughput and ETA every N completions

use std::time::{Duration, Instant};

pub const DEFAULT_PROGRESS_EVERY: usize = 10;

#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    failed: usize,
    every: usize,
    started: Instant,
}

/// One progress report
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub failed: usize,
    /// Batches per second since the tracker started
    pub rate: f64,
    pub eta: Option<Duration>,
}

impl ProgressTracker {
    pub fn new(total: usize, every: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            every: every.max(1),
            started: Instant::now(),
        }
    }

    /// Count one finished batch (any outcome); logs on the reporting cadence
    /// and on the last batch
    pub fn record(&mut self, failed: bool) -> Option<ProgressSnapshot> {
        self.completed += 1;
        if failed {
            self.failed += 1;
        }

        if self.completed % self.every != 0 && self.completed != self.total {
            return None;
        }

        let snapshot = self.snapshot();
        let eta = snapshot
            .eta
            .map(|d| format!("{:.0}s", d.as_secs_f64()))
            .unwrap_or_else(|| "unknown".to_string());
        log::info!(
            "📈 Progress: {}/{} batches ({:.1}%), {:.2} batches/s, ETA {}, {} failed",
            snapshot.completed,
            snapshot.total,
            self.percent(),
            snapshot.rate,
            eta,
            snapshot.failed
        );
        Some(snapshot)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot_at(self.started.elapsed())
    }

    fn snapshot_at(&self, elapsed: Duration) -> ProgressSnapshot {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        };
        let remaining = self.total.saturating_sub(self.completed);
        let eta = if remaining == 0 {
            Some(Duration::ZERO)
        } else if rate > 0.0 {
            Some(Duration::from_secs_f64(remaining as f64 / rate))
        } else {
            None
        };

        ProgressSnapshot {
            completed: self.completed,
            total: self.total,
            failed: self.failed,
            rate,
            eta,
        }
    }

    fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
