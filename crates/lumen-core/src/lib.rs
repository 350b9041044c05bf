//! Lumen Core - DMX Channel Model
//!
//! This crate contains the in-memory lighting state that the output engine
//! transmits, including:
//! - Per-universe base channel arrays ([`UniverseStore`])
//! - Sparse per-channel overrides that shadow the base values ([`OverrideLayer`])
//! - Change tracking so only modified universes are re-sent ([`ChangeTracker`])
//! - The combined, resolved view used by the scheduler ([`ChannelState`])
//! - Output and logging configuration ([`OutputConfig`], [`LogConfig`])
//!
//! Universes are numbered from 1 and channels from 1 to [`DMX_CHANNELS`].
//! Out-of-range addresses are ignored silently and values are clamped to
//! `0..=255` on write.

#![warn(missing_docs)]

pub mod config;
pub mod dirty;
pub mod error;
pub mod logging;
pub mod overrides;
pub mod scene;
pub mod state;
pub mod universe;

pub use config::OutputConfig;
pub use dirty::{ChangeTracker, DirtySnapshot};
pub use error::{CoreError, Result};
pub use logging::LogConfig;
pub use overrides::OverrideLayer;
pub use scene::ActiveSceneId;
pub use state::{ChannelState, UniverseOutput};
pub use universe::{clamp_dmx, UniverseStore, DMX_CHANNELS};
