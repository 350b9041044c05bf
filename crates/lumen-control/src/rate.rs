//! Adaptive transmission rate
//!
//! Two modes: `High` sends at `refresh_rate_hz` but only when something
//! changed, `Idle` sends a keep-alive of every universe at `idle_rate_hz`.
//! A change (or an explicit promotion) switches to `High`; going
//! `high_rate_duration` without changes drops back to `Idle`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use lumen_core::OutputConfig;

/// Transmission cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateMode {
    /// Recent changes, send at the refresh rate
    High,
    /// No recent changes, send keep-alives at the idle rate
    Idle,
}

/// What a tick should send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushKind {
    /// Nothing this tick
    Skip,
    /// Only the dirty universes
    Changed,
    /// Every configured universe
    KeepAlive,
}

/// Outcome of evaluating one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    /// What to send
    pub flush: FlushKind,
    /// Mode after this tick
    pub mode: RateMode,
    /// Whether the mode changed during this tick
    pub mode_changed: bool,
}

/// Rate mode state machine
#[derive(Debug, Clone)]
pub struct TransmissionState {
    mode: RateMode,
    current_rate_hz: u32,
    last_change: Option<Instant>,
    refresh_rate_hz: u32,
    idle_rate_hz: u32,
    high_rate_duration: Duration,
}

impl TransmissionState {
    /// Start in idle mode so the first tick broadcasts the full state
    pub fn new(refresh_rate_hz: u32, idle_rate_hz: u32, high_rate_duration: Duration) -> Self {
        Self {
            mode: RateMode::Idle,
            current_rate_hz: idle_rate_hz.max(1),
            last_change: None,
            refresh_rate_hz: refresh_rate_hz.max(1),
            idle_rate_hz: idle_rate_hz.max(1),
            high_rate_duration,
        }
    }

    /// Build from output configuration
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(
            config.refresh_rate_hz,
            config.idle_rate_hz,
            config.high_rate_duration(),
        )
    }

    /// Current mode
    pub fn mode(&self) -> RateMode {
        self.mode
    }

    /// Whether high-rate mode is active
    pub fn is_high_rate(&self) -> bool {
        self.mode == RateMode::High
    }

    /// Current rate in Hz
    pub fn current_rate_hz(&self) -> u32 {
        self.current_rate_hz
    }

    /// Time of the last recorded change
    pub fn last_change(&self) -> Option<Instant> {
        self.last_change
    }

    /// Delay until the next tick at the current rate
    pub fn interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.current_rate_hz))
    }

    /// Record a change and switch to high rate.
    ///
    /// Returns `true` if this switched the mode, i.e. the scheduler may be
    /// sleeping on the idle interval and should be woken.
    pub fn promote(&mut self, now: Instant) -> bool {
        self.last_change = Some(now);
        if self.mode == RateMode::High {
            return false;
        }
        self.mode = RateMode::High;
        self.current_rate_hz = self.refresh_rate_hz;
        true
    }

    /// Evaluate one tick given whether anything is dirty
    pub fn on_tick(&mut self, now: Instant, has_changes: bool) -> TickPlan {
        let mut mode_changed = false;

        if has_changes {
            mode_changed = self.promote(now);
        } else if self.mode == RateMode::High && self.high_rate_expired(now) {
            self.mode = RateMode::Idle;
            self.current_rate_hz = self.idle_rate_hz;
            mode_changed = true;
        }

        let flush = match (self.mode, has_changes) {
            (_, true) => FlushKind::Changed,
            (RateMode::High, false) => FlushKind::Skip,
            (RateMode::Idle, false) => FlushKind::KeepAlive,
        };

        TickPlan {
            flush,
            mode: self.mode,
            mode_changed,
        }
    }

    fn high_rate_expired(&self, now: Instant) -> bool {
        match self.last_change {
            Some(last) => now.saturating_duration_since(last) > self.high_rate_duration,
            None => true,
        }
    }
}
