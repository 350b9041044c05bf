#![allow(dead_code)]

use lumen_control::{ControlError, DmxEngine, DmxTransport, Result};
use lumen_core::{OutputConfig, DMX_CHANNELS};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A packet captured by [`RecordingTransport`]
#[derive(Debug, Clone)]
pub struct SentPacket {
    pub universe: u16,
    pub at: Instant,
    pub channels: [u8; DMX_CHANNELS],
}

/// Transport that keeps every packet in memory
#[derive(Default)]
pub struct RecordingTransport {
    packets: Mutex<Vec<SentPacket>>,
    fail_universe: Option<u16>,
}

impl RecordingTransport {
    /// Fails every send for `universe`
    pub fn failing_for(universe: u16) -> Self {
        Self {
            fail_universe: Some(universe),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.packets.lock().len()
    }

    pub fn packets(&self) -> Vec<SentPacket> {
        self.packets.lock().clone()
    }

    /// Packets recorded after the first `from`
    pub fn since(&self, from: usize) -> Vec<SentPacket> {
        self.packets.lock()[from..].to_vec()
    }
}

impl DmxTransport for RecordingTransport {
    fn send(&self, universe: u16, channels: &[u8; DMX_CHANNELS]) -> Result<()> {
        if self.fail_universe == Some(universe) {
            return Err(ControlError::DmxError("simulated send failure".to_string()));
        }
        self.packets.lock().push(SentPacket {
            universe,
            at: Instant::now(),
            channels: *channels,
        });
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

pub fn test_config(universes: u16) -> OutputConfig {
    OutputConfig {
        universe_count: universes,
        refresh_rate_hz: 44,
        idle_rate_hz: 1,
        high_rate_duration_ms: 2000,
        ..Default::default()
    }
}

/// Start an engine on the current runtime with a recording transport
pub fn start_engine(universes: u16) -> (Arc<DmxEngine>, Arc<RecordingTransport>) {
    start_engine_with(universes, RecordingTransport::default())
}

pub fn start_engine_with(
    universes: u16,
    transport: RecordingTransport,
) -> (Arc<DmxEngine>, Arc<RecordingTransport>) {
    start_engine_config(test_config(universes), transport)
}

/// Start an engine built from `config`
pub fn start_engine_config(
    config: OutputConfig,
    transport: RecordingTransport,
) -> (Arc<DmxEngine>, Arc<RecordingTransport>) {
    let engine = Arc::new(DmxEngine::new(config).unwrap());
    let transport = Arc::new(transport);
    engine
        .start_with_transport(Some(transport.clone() as Arc<dyn DmxTransport>))
        .unwrap();
    (engine, transport)
}

/// Let the scheduler task run without moving time meaningfully
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
