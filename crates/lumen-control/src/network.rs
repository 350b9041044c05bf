//! Network-interface selection
//!
//! The engine asks an [`InterfaceSelector`] once at start for the broadcast
//! address to send to. `None` means Art-Net output is disabled and the engine
//! runs in simulation mode.

use lumen_core::OutputConfig;

/// Chooses the Art-Net broadcast destination
pub trait InterfaceSelector {
    /// Broadcast address, or `None` to run without a transport
    fn broadcast_address(&self) -> Option<String>;
}

impl<F> InterfaceSelector for F
where
    F: Fn() -> Option<String>,
{
    fn broadcast_address(&self) -> Option<String> {
        self()
    }
}

/// Selector backed by the static output configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredInterface {
    enabled: bool,
    address: String,
}

impl ConfiguredInterface {
    /// Use `address` when `enabled`
    pub fn new(enabled: bool, address: impl Into<String>) -> Self {
        Self {
            enabled,
            address: address.into(),
        }
    }
}

impl From<&OutputConfig> for ConfiguredInterface {
    fn from(config: &OutputConfig) -> Self {
        Self::new(config.artnet_enabled, config.broadcast_address.clone())
    }
}

impl InterfaceSelector for ConfiguredInterface {
    fn broadcast_address(&self) -> Option<String> {
        let address = self.address.trim();
        (self.enabled && !address.is_empty()).then(|| address.to_string())
    }
}
