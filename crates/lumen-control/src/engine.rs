//! DMX output engine
//!
//! [`DmxEngine`] is the object collaborators hold (a scene-fade driver, API
//! handlers). It owns the channel state and the single scheduler task.
//!
//! All channel state, the change tracker and the rate state sit behind one
//! mutex, so "value changed, write it, mark dirty, maybe promote" is atomic
//! per call no matter how many callers write concurrently.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lumen_control::{ConfiguredInterface, DmxEngine};
//! use lumen_core::OutputConfig;
//!
//! # async fn run() -> lumen_control::Result<()> {
//! let config = OutputConfig::default();
//! let engine = Arc::new(DmxEngine::new(config.clone())?);
//! engine.start(&ConfiguredInterface::from(&config))?;
//!
//! engine.set_channel_value(1, 1, 255);
//!
//! engine.stop().await;
//! # Ok(())
//! # }
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use chrono::Utc;
use lumen_core::{ActiveSceneId, ChannelState, OutputConfig, UniverseOutput, DMX_CHANNELS};

use crate::dmx::{ArtNetSender, DmxTransport};
use crate::network::InterfaceSelector;
use crate::rate::TransmissionState;
use crate::scheduler;
use crate::status::{TransmissionCounters, TransmissionStatus};
use crate::{error::ControlError, Result};

/// State guarded by the engine mutex
pub(crate) struct Shared {
    pub channels: ChannelState,
    pub transmission: TransmissionState,
    pub counters: TransmissionCounters,
}

struct RunHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    transport: Option<Arc<dyn DmxTransport>>,
}

/// Real-time DMX output engine
pub struct DmxEngine {
    config: OutputConfig,
    pub(crate) shared: Mutex<Shared>,
    pub(crate) wake: Notify,
    run: Mutex<Option<RunHandle>>,
}

impl DmxEngine {
    /// Create an engine with `config.universe_count` zeroed universes.
    ///
    /// Nothing is transmitted until [`start`](Self::start).
    pub fn new(config: OutputConfig) -> Result<Self> {
        config.validate()?;
        let shared = Shared {
            channels: ChannelState::new(config.universe_count),
            transmission: TransmissionState::from_config(&config),
            counters: TransmissionCounters::default(),
        };
        Ok(Self {
            config,
            shared: Mutex::new(shared),
            wake: Notify::new(),
            run: Mutex::new(None),
        })
    }

    /// Configuration the engine was built with
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Number of configured universes
    pub fn universe_count(&self) -> u16 {
        self.config.universe_count
    }

    /// Start the scheduler, sending Art-Net to the selector's address.
    ///
    /// A selector returning `None` starts in simulation mode. Socket
    /// creation failures are returned, not logged.
    pub fn start(self: &Arc<Self>, selector: &dyn InterfaceSelector) -> Result<()> {
        // Checked again under the lock in start_with_transport
        if self.is_running() {
            return Err(ControlError::AlreadyRunning);
        }
        let transport: Option<Arc<dyn DmxTransport>> = match selector.broadcast_address() {
            Some(address) => {
                let sender = ArtNetSender::new(&address, self.config.artnet_port)?;
                Some(Arc::new(sender) as Arc<dyn DmxTransport>)
            }
            None => {
                info!("Art-Net disabled, DMX output running in simulation mode");
                None
            }
        };
        self.start_with_transport(transport)
    }

    /// Start the scheduler with an explicit transport (`None` = simulation)
    pub fn start_with_transport(
        self: &Arc<Self>,
        transport: Option<Arc<dyn DmxTransport>>,
    ) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ControlError::NoRuntime(e.to_string()))?;

        let mut run = self.run.lock();
        if run.is_some() {
            return Err(ControlError::AlreadyRunning);
        }

        let destination = transport.as_ref().map(|t| t.describe());
        {
            let mut shared = self.shared.lock();
            shared.counters.running = true;
            shared.counters.destination = destination.clone();
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = runtime.spawn(scheduler::run(
            Arc::clone(self),
            transport.clone(),
            shutdown_rx,
        ));

        info!(
            universes = self.config.universe_count,
            refresh_rate_hz = self.config.refresh_rate_hz,
            idle_rate_hz = self.config.idle_rate_hz,
            destination = destination.as_deref().unwrap_or("simulation"),
            "DMX output started"
        );

        *run = Some(RunHandle {
            shutdown,
            task,
            transport,
        });
        Ok(())
    }

    /// Whether the scheduler task is running
    pub fn is_running(&self) -> bool {
        self.run.lock().is_some()
    }

    /// Stop the scheduler and black out.
    ///
    /// Cancels the loop, zeroes every channel and override, resets the rate
    /// to idle, sends one all-zero packet per universe (best effort) and
    /// releases the transport.
    pub async fn stop(&self) {
        let handle = self.run.lock().take();
        let transport = match handle {
            Some(RunHandle {
                shutdown,
                task,
                transport,
            }) => {
                let _ = shutdown.send(true);
                if let Err(e) = task.await {
                    warn!(error = %e, "DMX scheduler task ended abnormally");
                }
                transport
            }
            None => None,
        };

        let universes = {
            let mut shared = self.shared.lock();
            shared.channels.blackout();
            // A restart begins idle so its first tick is a keep-alive
            shared.transmission = TransmissionState::from_config(&self.config);
            shared.counters.running = false;
            shared.channels.universe_ids()
        };

        if let Some(transport) = transport {
            let blackout = [0u8; DMX_CHANNELS];
            let mut sent = 0u64;
            for universe in &universes {
                match transport.send(*universe, &blackout) {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        warn!(universe, error = %e, "Failed to send blackout packet");
                    }
                }
            }
            let mut shared = self.shared.lock();
            shared.counters.packets_sent += sent;
            shared.counters.last_transmission_at = Some(Utc::now());
        }

        info!(universes = universes.len(), "DMX output stopped");
    }

    /// Set a base channel value. Out-of-range addresses are ignored and the
    /// value is clamped to `0..=255`.
    pub fn set_channel_value(&self, universe: u16, channel: u16, value: i32) {
        let mut shared = self.shared.lock();
        if shared.channels.set_channel_value(universe, channel, value) {
            self.promote(&mut shared);
        }
    }

    /// Base value of a channel, 0 if out of range
    pub fn get_channel_value(&self, universe: u16, channel: u16) -> u8 {
        self.shared.lock().channels.get_channel_value(universe, channel)
    }

    /// Set an override that shadows the base value
    pub fn set_channel_override(&self, universe: u16, channel: u16, value: i32) {
        let mut shared = self.shared.lock();
        if shared.channels.set_channel_override(universe, channel, value) {
            self.promote(&mut shared);
        }
    }

    /// Remove an override, if present
    pub fn clear_channel_override(&self, universe: u16, channel: u16) {
        let mut shared = self.shared.lock();
        if shared.channels.clear_channel_override(universe, channel) {
            self.promote(&mut shared);
        }
    }

    /// Remove every override
    pub fn clear_all_overrides(&self) {
        let mut shared = self.shared.lock();
        if shared.channels.clear_all_overrides() {
            self.promote(&mut shared);
        }
    }

    /// Resolved output of a universe; all zeros if unknown
    pub fn get_universe_output(&self, universe: u16) -> [u8; DMX_CHANNELS] {
        self.shared.lock().channels.universe_output(universe)
    }

    /// Resolved output of a universe, or `None` if unknown
    pub fn get_universe_channels(&self, universe: u16) -> Option<[u8; DMX_CHANNELS]> {
        self.shared.lock().channels.universe_channels(universe)
    }

    /// Resolved output of every universe
    pub fn get_all_universe_outputs(&self) -> Vec<UniverseOutput> {
        self.shared.lock().channels.all_universe_outputs()
    }

    /// Record which scene is live
    pub fn set_active_scene(&self, scene: impl Into<ActiveSceneId>) {
        self.shared.lock().channels.set_active_scene(scene);
    }

    /// Scene currently live
    pub fn get_current_active_scene_id(&self) -> Option<ActiveSceneId> {
        self.shared.lock().channels.active_scene().cloned()
    }

    /// Forget the live scene
    pub fn clear_active_scene(&self) {
        self.shared.lock().channels.clear_active_scene();
    }

    /// Switch to the high rate ahead of an expected burst of updates
    pub fn trigger_change_detection(&self) {
        let mut shared = self.shared.lock();
        self.promote(&mut shared);
    }

    /// Diagnostic snapshot of the scheduler
    pub fn get_transmission_status(&self) -> TransmissionStatus {
        let shared = self.shared.lock();
        let tracker = shared.channels.tracker();
        let counters = &shared.counters;
        TransmissionStatus {
            current_rate_hz: shared.transmission.current_rate_hz(),
            mode: shared.transmission.mode(),
            is_high_rate: shared.transmission.is_high_rate(),
            is_dirty: tracker.is_dirty(),
            dirty_universe_count: tracker.dirty_count(),
            dirty_universes: tracker.dirty_universes(),
            last_change: counters.last_change_at,
            last_transmission: counters.last_transmission_at,
            running: counters.running,
            simulation: counters.running && counters.destination.is_none(),
            destination: counters.destination.clone(),
            packets_sent: counters.packets_sent,
            send_errors: counters.send_errors,
            change_flushes: counters.change_flushes,
            keepalive_flushes: counters.keepalive_flushes,
            drift: counters.drift,
        }
    }

    fn promote(&self, shared: &mut Shared) {
        shared.counters.last_change_at = Some(Utc::now());
        if shared.transmission.promote(Instant::now()) {
            debug!(
                rate_hz = shared.transmission.current_rate_hz(),
                "DMX output switched to high rate"
            );
            // The loop may be sleeping on the idle interval
            self.wake.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ConfiguredInterface;
    use crate::rate::RateMode;

    fn engine(universes: u16) -> DmxEngine {
        DmxEngine::new(OutputConfig {
            universe_count: universes,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = DmxEngine::new(OutputConfig {
            universe_count: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(ControlError::Config(_))));
    }

    #[test]
    fn test_change_promotes_to_high_rate() {
        let engine = engine(2);
        assert_eq!(engine.get_transmission_status().mode, RateMode::Idle);

        engine.set_channel_value(1, 1, 255);
        let status = engine.get_transmission_status();
        assert_eq!(status.mode, RateMode::High);
        assert_eq!(status.current_rate_hz, 44);
        assert_eq!(status.dirty_universes, vec![1]);
        assert!(status.last_change.is_some());
    }

    #[test]
    fn test_redundant_write_does_not_promote() {
        let engine = engine(1);
        engine.set_channel_value(1, 1, 0);
        let status = engine.get_transmission_status();
        assert_eq!(status.mode, RateMode::Idle);
        assert!(!status.is_dirty);
        assert!(status.last_change.is_none());
    }

    #[test]
    fn test_clearing_missing_override_does_not_promote() {
        let engine = engine(1);
        engine.clear_channel_override(1, 1);
        engine.clear_all_overrides();
        assert_eq!(engine.get_transmission_status().mode, RateMode::Idle);
    }

    #[test]
    fn test_trigger_change_detection_promotes_without_dirtying() {
        let engine = engine(1);
        engine.trigger_change_detection();
        let status = engine.get_transmission_status();
        assert_eq!(status.mode, RateMode::High);
        assert!(!status.is_dirty);
    }

    #[test]
    fn test_override_precedence() {
        let engine = engine(1);
        engine.set_channel_override(1, 1, 100);
        engine.set_channel_value(1, 1, 50);
        assert_eq!(engine.get_universe_output(1)[0], 100);
        engine.clear_channel_override(1, 1);
        assert_eq!(engine.get_universe_output(1)[0], 50);
    }

    #[test]
    fn test_active_scene() {
        let engine = engine(1);
        engine.set_active_scene("scene-a");
        assert_eq!(
            engine.get_current_active_scene_id(),
            Some(ActiveSceneId::new("scene-a"))
        );
        engine.clear_active_scene();
        assert!(engine.get_current_active_scene_id().is_none());
    }

    #[tokio::test]
    async fn test_stop_resets_rate_to_idle() {
        let engine = Arc::new(engine(1));
        engine.start_with_transport(None).unwrap();
        engine.set_channel_value(1, 1, 10);
        assert_eq!(engine.get_transmission_status().mode, RateMode::High);

        engine.stop().await;
        let status = engine.get_transmission_status();
        assert_eq!(status.mode, RateMode::Idle);
        assert_eq!(status.current_rate_hz, 1);
    }

    #[tokio::test]
    async fn test_second_start_does_not_open_socket() {
        let engine = Arc::new(engine(1));
        engine.start_with_transport(None).unwrap();

        // An unparsable address would fail with InvalidAddress if a socket
        // were created before the running check
        let result = engine.start(&ConfiguredInterface::new(true, "not-an-ip"));
        assert!(matches!(result, Err(ControlError::AlreadyRunning)));
        engine.stop().await;
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let engine = Arc::new(engine(1));
        let result = engine.start_with_transport(None);
        assert!(matches!(result, Err(ControlError::NoRuntime(_))));
        assert!(!engine.is_running());
    }
}
