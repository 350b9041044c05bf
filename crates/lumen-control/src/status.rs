//! Transmission status reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::drift::DriftStats;
use crate::rate::RateMode;
use crate::Result;

/// Running totals kept next to the channel state
#[derive(Debug, Clone, Default)]
pub(crate) struct TransmissionCounters {
    pub running: bool,
    pub destination: Option<String>,
    pub packets_sent: u64,
    pub send_errors: u64,
    pub change_flushes: u64,
    pub keepalive_flushes: u64,
    pub last_change_at: Option<DateTime<Utc>>,
    pub last_transmission_at: Option<DateTime<Utc>>,
    pub drift: DriftStats,
}

/// Point-in-time snapshot for status displays and subscriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionStatus {
    /// Current transmission rate
    pub current_rate_hz: u32,
    /// Current rate mode
    pub mode: RateMode,
    /// Whether the high rate is active
    pub is_high_rate: bool,
    /// Whether any universe awaits transmission
    pub is_dirty: bool,
    /// Number of universes awaiting transmission
    pub dirty_universe_count: usize,
    /// Universes awaiting transmission, ascending
    pub dirty_universes: Vec<u16>,
    /// Wall-clock time of the last change
    pub last_change: Option<DateTime<Utc>>,
    /// Wall-clock time of the last flush
    pub last_transmission: Option<DateTime<Utc>>,
    /// Whether the scheduler is running
    pub running: bool,
    /// Running without a transport (Art-Net disabled)
    pub simulation: bool,
    /// Transport destination, if any
    pub destination: Option<String>,
    /// Packets handed to the transport successfully
    pub packets_sent: u64,
    /// Packets the transport failed to send
    pub send_errors: u64,
    /// Flushes triggered by changes
    pub change_flushes: u64,
    /// Idle keep-alive flushes
    pub keepalive_flushes: u64,
    /// Tick drift statistics
    pub drift: DriftStats,
}

impl TransmissionStatus {
    /// Serialize as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
