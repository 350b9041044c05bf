//! Output transport abstraction
//!
//! The scheduler hands resolved universes to a [`DmxTransport`]. Each
//! transport owns its wire encoding, so additional protocols can sit next to
//! [`ArtNetSender`](super::ArtNetSender) without touching the scheduler.

use lumen_core::DMX_CHANNELS;

use crate::Result;

/// Destination for resolved DMX universes
pub trait DmxTransport: Send + Sync {
    /// Encode and send one universe. Must not block.
    ///
    /// Errors are logged by the caller and never retried; the next tick
    /// resends current values anyway.
    fn send(&self, universe: u16, channels: &[u8; DMX_CHANNELS]) -> Result<()>;

    /// Human-readable destination for status output
    fn describe(&self) -> String;
}
