//! Channel overrides
//!
//! Overrides are sparse values keyed by universe and channel. When present
//! they replace the base value in the resolved output, and they are stored
//! and cleared independently of the base arrays.

use std::collections::{BTreeMap, HashMap};

use crate::universe::{channel_index, clamp_dmx, DMX_CHANNELS};

/// Sparse per-channel override values
#[derive(Debug, Clone, Default)]
pub struct OverrideLayer {
    // universe -> channel -> value
    values: BTreeMap<u16, HashMap<u16, u8>>,
}

impl OverrideLayer {
    /// Create an empty override layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an override. Returns `true` if it is new or its value changed.
    ///
    /// Channels outside `1..=512` are ignored.
    pub fn set(&mut self, universe: u16, channel: u16, value: i32) -> bool {
        if channel_index(channel).is_none() {
            return false;
        }
        let value = clamp_dmx(value);
        let channels = self.values.entry(universe).or_default();
        channels.insert(channel, value) != Some(value)
    }

    /// Remove an override. Returns `true` if one existed.
    pub fn clear(&mut self, universe: u16, channel: u16) -> bool {
        let Some(channels) = self.values.get_mut(&universe) else {
            return false;
        };
        let removed = channels.remove(&channel).is_some();
        if channels.is_empty() {
            self.values.remove(&universe);
        }
        removed
    }

    /// Remove every override, returning the universes that had at least one
    pub fn clear_all(&mut self) -> Vec<u16> {
        let affected = self
            .values
            .iter()
            .filter(|(_, channels)| !channels.is_empty())
            .map(|(universe, _)| *universe)
            .collect();
        self.values.clear();
        affected
    }

    /// Current override for a channel
    pub fn get(&self, universe: u16, channel: u16) -> Option<u8> {
        self.values.get(&universe)?.get(&channel).copied()
    }

    /// Number of overrides across all universes
    pub fn len(&self) -> usize {
        self.values.values().map(HashMap::len).sum()
    }

    /// Whether there are no overrides
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Substitute every override of `universe` into `data`
    pub fn apply(&self, universe: u16, data: &mut [u8; DMX_CHANNELS]) {
        if let Some(channels) = self.values.get(&universe) {
            for (&channel, &value) in channels {
                if let Some(index) = channel_index(channel) {
                    data[index] = value;
                }
            }
        }
    }
}
