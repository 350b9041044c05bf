//! Base channel storage
//!
//! A [`UniverseStore`] owns one 512-byte array per configured universe. The
//! universe count is fixed at construction.

/// Number of channels in a DMX universe
pub const DMX_CHANNELS: usize = 512;

/// Clamp an arbitrary integer into the DMX value range
pub fn clamp_dmx(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Map a 1-based channel number to an array index
pub(crate) fn channel_index(channel: u16) -> Option<usize> {
    if (1..=DMX_CHANNELS as u16).contains(&channel) {
        Some(channel as usize - 1)
    } else {
        None
    }
}

/// Per-universe base channel values
#[derive(Debug, Clone)]
pub struct UniverseStore {
    universes: Vec<[u8; DMX_CHANNELS]>,
}

impl UniverseStore {
    /// Create `count` universes, numbered `1..=count`, all channels at zero
    pub fn new(count: u16) -> Self {
        Self {
            universes: vec![[0u8; DMX_CHANNELS]; count as usize],
        }
    }

    /// Number of configured universes
    pub fn count(&self) -> u16 {
        self.universes.len() as u16
    }

    /// Whether `universe` is one of the configured universes
    pub fn contains(&self, universe: u16) -> bool {
        universe >= 1 && universe as usize <= self.universes.len()
    }

    /// All configured universe ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = u16> {
        1..=self.count()
    }

    /// Write a channel value.
    ///
    /// Unknown universes and channels outside `1..=512` are ignored. Returns
    /// `true` only when the stored value actually changed.
    pub fn set(&mut self, universe: u16, channel: u16, value: i32) -> bool {
        let Some(index) = channel_index(channel) else {
            return false;
        };
        let Some(data) = self.universe_mut(universe) else {
            return false;
        };

        let value = clamp_dmx(value);
        if data[index] == value {
            return false;
        }
        data[index] = value;
        true
    }

    /// Read a channel value, or 0 when the address is out of range
    pub fn get(&self, universe: u16, channel: u16) -> u8 {
        match (self.universe(universe), channel_index(channel)) {
            (Some(data), Some(index)) => data[index],
            _ => 0,
        }
    }

    /// Base array of a universe
    pub fn universe(&self, universe: u16) -> Option<&[u8; DMX_CHANNELS]> {
        if !self.contains(universe) {
            return None;
        }
        self.universes.get(universe as usize - 1)
    }

    fn universe_mut(&mut self, universe: u16) -> Option<&mut [u8; DMX_CHANNELS]> {
        if !self.contains(universe) {
            return None;
        }
        self.universes.get_mut(universe as usize - 1)
    }

    /// Force every channel of every universe to zero
    pub fn zero_all(&mut self) {
        for data in &mut self.universes {
            data.fill(0);
        }
    }
}
