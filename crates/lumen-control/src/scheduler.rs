//! Transmission scheduler
//!
//! One task per engine. Each pass evaluates the rate state machine, flushes
//! the universes it asks for, then sleeps for an interval computed fresh from
//! the current rate. A promotion to high rate wakes the sleep early.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use chrono::Utc;
use lumen_core::{DirtySnapshot, DMX_CHANNELS};

use crate::dmx::DmxTransport;
use crate::drift::DriftMonitor;
use crate::engine::DmxEngine;
use crate::rate::FlushKind;

/// Runs the transmission loop until `shutdown` fires.
///
/// # Arguments
/// * `engine` - Engine whose state is flushed
/// * `transport` - Destination, or `None` in simulation mode
/// * `shutdown` - Set to `true` (or dropped) to end the loop
pub(crate) async fn run(
    engine: Arc<DmxEngine>,
    transport: Option<Arc<dyn DmxTransport>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let config = engine.config();
    let mut drift = DriftMonitor::new(config.drift_threshold(), config.drift_throttle());

    loop {
        let now = Instant::now();
        if drift.observe(now).is_some() {
            engine.shared.lock().counters.drift = drift.stats();
        }

        let interval = tick(&engine, transport.as_deref(), now);
        drift.schedule(now, interval);

        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = engine.wake.notified() => {
                // Woken early by a promotion, not a timing sample
                drift.reset();
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    debug!("DMX scheduler loop exited");
}

/// Evaluate and execute one tick. Returns the delay until the next one.
pub(crate) fn tick(
    engine: &DmxEngine,
    transport: Option<&dyn DmxTransport>,
    now: Instant,
) -> Duration {
    let (frames, kind, interval) = {
        let mut shared = engine.shared.lock();

        let snapshot = shared.channels.tracker().snapshot();
        let has_changes = shared.channels.tracker().is_dirty();

        let plan = shared.transmission.on_tick(now, has_changes);
        if plan.mode_changed {
            debug!(
                mode = ?plan.mode,
                rate_hz = shared.transmission.current_rate_hz(),
                "DMX transmission rate changed"
            );
        }

        let universes = match (&snapshot, plan.flush) {
            (DirtySnapshot::Inconsistent, _) => {
                error!(
                    is_dirty = has_changes,
                    dirty = ?shared.channels.tracker().dirty_universes(),
                    "DMX dirty flag and dirty set disagree, skipping flush"
                );
                // Recorded universes go out next tick; a bare flag is dropped
                shared.channels.tracker_mut().restore_flag();
                Vec::new()
            }
            (_, FlushKind::Skip) => Vec::new(),
            (DirtySnapshot::Dirty(ids), FlushKind::Changed) => ids.clone(),
            (_, FlushKind::KeepAlive) => shared.channels.universe_ids(),
            (DirtySnapshot::Clean, FlushKind::Changed) => Vec::new(),
        };

        let frames: Vec<(u16, [u8; DMX_CHANNELS])> = universes
            .into_iter()
            .map(|universe| (universe, shared.channels.universe_output(universe)))
            .collect();

        // Anything marked after this point belongs to the next tick
        if !frames.is_empty() {
            shared.channels.tracker_mut().clear();
        }

        (frames, plan.flush, shared.transmission.interval())
    };

    if !frames.is_empty() {
        flush(engine, transport, &frames, kind);
    }

    interval
}

fn flush(
    engine: &DmxEngine,
    transport: Option<&dyn DmxTransport>,
    frames: &[(u16, [u8; DMX_CHANNELS])],
    kind: FlushKind,
) {
    let mut sent = 0u64;
    let mut failed = 0u64;

    match transport {
        Some(transport) => {
            for (universe, channels) in frames {
                match transport.send(*universe, channels) {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        failed += 1;
                        warn!(universe = *universe, error = %e, "Failed to send DMX packet");
                    }
                }
            }
        }
        None => {
            trace!(universes = frames.len(), ?kind, "Simulated DMX flush");
        }
    }

    let mut shared = engine.shared.lock();
    let counters = &mut shared.counters;
    counters.packets_sent += sent;
    counters.send_errors += failed;
    counters.last_transmission_at = Some(Utc::now());
    match kind {
        FlushKind::KeepAlive => counters.keepalive_flushes += 1,
        _ => counters.change_flushes += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::RateMode;
    use crate::Result;
    use lumen_core::OutputConfig;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        packets: Mutex<Vec<(u16, u8)>>,
    }

    impl DmxTransport for Recorder {
        fn send(&self, universe: u16, channels: &[u8; DMX_CHANNELS]) -> Result<()> {
            self.packets.lock().push((universe, channels[0]));
            Ok(())
        }

        fn describe(&self) -> String {
            "recorder".to_string()
        }
    }

    fn engine() -> DmxEngine {
        DmxEngine::new(OutputConfig {
            universe_count: 3,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_first_tick_is_keepalive_of_all_universes() {
        let engine = engine();
        let recorder = Recorder::default();

        let interval = tick(&engine, Some(&recorder), Instant::now());
        assert_eq!(interval, Duration::from_secs(1));
        assert_eq!(*recorder.packets.lock(), vec![(1, 0), (2, 0), (3, 0)]);
        assert_eq!(engine.get_transmission_status().keepalive_flushes, 1);
    }

    #[test]
    fn test_changed_tick_flushes_only_dirty_universes() {
        let engine = engine();
        let recorder = Recorder::default();

        engine.set_channel_value(2, 1, 77);
        let interval = tick(&engine, Some(&recorder), Instant::now());

        assert_eq!(interval, Duration::from_micros(22_727));
        assert_eq!(*recorder.packets.lock(), vec![(2, 77)]);
        let status = engine.get_transmission_status();
        assert!(!status.is_dirty);
        assert_eq!(status.change_flushes, 1);
        assert_eq!(status.packets_sent, 1);
    }

    #[test]
    fn test_high_rate_tick_without_changes_sends_nothing() {
        let engine = engine();
        let recorder = Recorder::default();
        let t0 = Instant::now();

        engine.set_channel_value(1, 1, 1);
        tick(&engine, Some(&recorder), t0);
        tick(&engine, Some(&recorder), t0 + Duration::from_millis(23));

        assert_eq!(recorder.packets.lock().len(), 1);
        assert_eq!(engine.get_transmission_status().mode, RateMode::High);
    }

    #[test]
    fn test_dirty_flag_without_universes_skips_flush() {
        let engine = engine();
        let recorder = Recorder::default();
        engine.shared.lock().channels.tracker_mut().set_flag_only();

        tick(&engine, Some(&recorder), Instant::now());

        assert!(recorder.packets.lock().is_empty());
        let status = engine.get_transmission_status();
        assert!(!status.is_dirty);
        assert_eq!(status.dirty_universe_count, 0);
        assert_eq!(status.change_flushes + status.keepalive_flushes, 0);
    }

    #[test]
    fn test_dirty_universes_without_flag_are_sent_next_tick() {
        let engine = engine();
        let recorder = Recorder::default();
        let t0 = Instant::now();

        engine.set_channel_value(2, 1, 5);
        {
            let mut shared = engine.shared.lock();
            let tracker = shared.channels.tracker_mut();
            tracker.clear();
            tracker.insert_without_flag(2);
        }

        tick(&engine, Some(&recorder), t0);
        assert!(recorder.packets.lock().is_empty());
        assert_eq!(engine.get_transmission_status().dirty_universes, vec![2]);

        tick(&engine, Some(&recorder), t0 + Duration::from_millis(23));
        assert_eq!(*recorder.packets.lock(), vec![(2, 5)]);
        assert!(!engine.get_transmission_status().is_dirty);
    }

    #[test]
    fn test_simulation_counts_flush_without_packets() {
        let engine = engine();
        engine.set_channel_value(1, 1, 10);
        tick(&engine, None, Instant::now());

        let status = engine.get_transmission_status();
        assert_eq!(status.packets_sent, 0);
        assert_eq!(status.change_flushes, 1);
        assert!(status.last_transmission.is_some());
    }
}
