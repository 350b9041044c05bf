//! Tick drift monitoring
//!
//! Compares the actual time between two ticks with the interval that was
//! scheduled. Purely observational: it logs throttled warnings and keeps
//! statistics but never changes the schedule.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Drift statistics for status reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftStats {
    /// Drift of the most recent measured tick, in milliseconds
    pub last_drift_ms: f64,
    /// Largest drift seen since start, in milliseconds
    pub max_drift_ms: f64,
    /// Number of warnings logged
    pub drift_warnings: u64,
}

/// Observes actual vs. expected tick intervals
#[derive(Debug)]
pub struct DriftMonitor {
    threshold: Option<Duration>,
    throttle: Duration,
    pending: Option<(Instant, Duration)>,
    last_warning: Option<Instant>,
    stats: DriftStats,
}

impl DriftMonitor {
    /// `threshold` of `None` (or zero) disables monitoring
    pub fn new(threshold: Option<Duration>, throttle: Duration) -> Self {
        Self {
            threshold: threshold.filter(|t| !t.is_zero()),
            throttle,
            pending: None,
            last_warning: None,
            stats: DriftStats::default(),
        }
    }

    /// Whether drift is being measured at all
    pub fn is_enabled(&self) -> bool {
        self.threshold.is_some()
    }

    /// Note that the next tick is expected `interval` after `tick_at`
    pub fn schedule(&mut self, tick_at: Instant, interval: Duration) {
        if self.is_enabled() {
            self.pending = Some((tick_at, interval));
        }
    }

    /// Forget the pending expectation, e.g. after an early wake-up
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Measure a tick against the last schedule. Returns the drift if one
    /// was measured.
    pub fn observe(&mut self, now: Instant) -> Option<Duration> {
        let threshold = self.threshold?;
        let (scheduled_at, expected) = self.pending.take()?;

        let actual = now.saturating_duration_since(scheduled_at);
        let drift = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };

        let drift_ms = drift.as_secs_f64() * 1000.0;
        self.stats.last_drift_ms = drift_ms;
        if drift_ms > self.stats.max_drift_ms {
            self.stats.max_drift_ms = drift_ms;
        }

        if drift > threshold && self.warning_allowed(now) {
            self.last_warning = Some(now);
            self.stats.drift_warnings += 1;
            warn!(
                expected_ms = expected.as_secs_f64() * 1000.0,
                actual_ms = actual.as_secs_f64() * 1000.0,
                drift_ms,
                "DMX tick drift exceeds threshold"
            );
        }

        Some(drift)
    }

    /// Current statistics
    pub fn stats(&self) -> DriftStats {
        self.stats
    }

    fn warning_allowed(&self, now: Instant) -> bool {
        match self.last_warning {
            Some(last) => now.saturating_duration_since(last) >= self.throttle,
            None => true,
        }
    }
}
