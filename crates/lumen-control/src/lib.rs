//! Lumen Control - Real-time DMX Output
//!
//! This crate turns the channel model from `lumen-core` into Art-Net traffic:
//! - **Art-Net**: byte-exact OpDmx encoding and a UDP broadcast sender
//! - **Scheduler**: adaptive-rate loop that sends changed universes at the
//!   refresh rate and keep-alives of every universe at the idle rate
//! - **Drift monitor**: throttled warnings when ticks run late
//! - **Engine**: the handle collaborators use to write channels, manage
//!   overrides and read status
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lumen_control::{ConfiguredInterface, DmxEngine};
//! use lumen_core::OutputConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> lumen_control::Result<()> {
//! let config = OutputConfig::load(None)?;
//! let engine = Arc::new(DmxEngine::new(config.clone())?);
//! engine.start(&ConfiguredInterface::from(&config))?;
//!
//! // Hand `engine.clone()` to the fade driver and API layer
//! engine.set_channel_value(1, 1, 255);
//! println!("{:?}", engine.get_transmission_status());
//!
//! engine.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`dmx`] - Art-Net encoding and transports
//! - [`engine`] - Engine facade
//! - [`rate`] - Rate mode state machine
//! - [`drift`] - Tick drift monitoring
//! - [`network`] - Broadcast address selection
//! - [`status`] - Status snapshot
//! - [`error`] - Error types

#![warn(missing_docs)]

/// DMX output (Art-Net)
pub mod dmx;
/// Tick drift monitoring
pub mod drift;
/// Engine facade
pub mod engine;
/// Error types
pub mod error;
/// Broadcast address selection
pub mod network;
/// Rate mode state machine
pub mod rate;
mod scheduler;
/// Status snapshot
pub mod status;

// Re-exports
pub use dmx::{encode_dmx, ArtNetSender, DmxTransport, ARTDMX_PACKET_LEN};
pub use drift::{DriftMonitor, DriftStats};
pub use engine::DmxEngine;
pub use error::{ControlError, Result};
pub use network::{ConfiguredInterface, InterfaceSelector};
pub use rate::{FlushKind, RateMode, TickPlan, TransmissionState};
pub use status::TransmissionStatus;
