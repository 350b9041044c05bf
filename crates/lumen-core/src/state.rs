//! Resolved channel state
//!
//! [`ChannelState`] combines base values, overrides and the change tracker so
//! that "did the value change, write it, mark the universe dirty" happens as a
//! single step. Callers that share it across threads wrap it in one lock
//! together with the transmission state.

use serde::{Deserialize, Serialize};

use crate::dirty::ChangeTracker;
use crate::overrides::OverrideLayer;
use crate::scene::ActiveSceneId;
use crate::universe::{UniverseStore, DMX_CHANNELS};

/// Resolved output of one universe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseOutput {
    /// Universe id (1-based)
    pub universe: u16,
    /// 512 channel values with overrides applied
    pub channels: Vec<u8>,
}

/// Base values, overrides, dirty tracking and the active scene token
#[derive(Debug, Clone)]
pub struct ChannelState {
    store: UniverseStore,
    overrides: OverrideLayer,
    tracker: ChangeTracker,
    active_scene: Option<ActiveSceneId>,
}

impl ChannelState {
    /// Create `universe_count` zeroed universes
    pub fn new(universe_count: u16) -> Self {
        Self {
            store: UniverseStore::new(universe_count),
            overrides: OverrideLayer::new(),
            tracker: ChangeTracker::new(),
            active_scene: None,
        }
    }

    /// Number of configured universes
    pub fn universe_count(&self) -> u16 {
        self.store.count()
    }

    /// Write a base value; marks the universe dirty and returns `true` only
    /// on a real change
    pub fn set_channel_value(&mut self, universe: u16, channel: u16, value: i32) -> bool {
        let changed = self.store.set(universe, channel, value);
        if changed {
            self.tracker.mark_dirty(universe);
        }
        changed
    }

    /// Base value, or 0 when out of range
    pub fn get_channel_value(&self, universe: u16, channel: u16) -> u8 {
        self.store.get(universe, channel)
    }

    /// Set an override; marks the universe dirty if it is new or changed
    pub fn set_channel_override(&mut self, universe: u16, channel: u16, value: i32) -> bool {
        if !self.store.contains(universe) {
            return false;
        }
        let changed = self.overrides.set(universe, channel, value);
        if changed {
            self.tracker.mark_dirty(universe);
        }
        changed
    }

    /// Remove an override; marks the universe dirty only if one existed
    pub fn clear_channel_override(&mut self, universe: u16, channel: u16) -> bool {
        let removed = self.overrides.clear(universe, channel);
        if removed {
            self.tracker.mark_dirty(universe);
        }
        removed
    }

    /// Remove every override; marks each affected universe dirty once.
    /// Returns `true` if anything was removed.
    pub fn clear_all_overrides(&mut self) -> bool {
        let affected = self.overrides.clear_all();
        for universe in &affected {
            self.tracker.mark_dirty(*universe);
        }
        !affected.is_empty()
    }

    /// Current override for a channel, if any
    pub fn channel_override(&self, universe: u16, channel: u16) -> Option<u8> {
        self.overrides.get(universe, channel)
    }

    /// Resolved output; unknown universes yield an all-zero array
    pub fn universe_output(&self, universe: u16) -> [u8; DMX_CHANNELS] {
        self.universe_channels(universe).unwrap_or([0u8; DMX_CHANNELS])
    }

    /// Resolved output, or `None` for unknown universes
    pub fn universe_channels(&self, universe: u16) -> Option<[u8; DMX_CHANNELS]> {
        let mut data = *self.store.universe(universe)?;
        self.overrides.apply(universe, &mut data);
        Some(data)
    }

    /// Resolved output of every configured universe
    pub fn all_universe_outputs(&self) -> Vec<UniverseOutput> {
        self.store
            .ids()
            .map(|universe| UniverseOutput {
                universe,
                channels: self.universe_output(universe).to_vec(),
            })
            .collect()
    }

    /// All configured universe ids
    pub fn universe_ids(&self) -> Vec<u16> {
        self.store.ids().collect()
    }

    /// Change tracker (read-only)
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Change tracker, for the scheduler to clear after a flush
    pub fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }

    /// Zero every base value and drop every override.
    ///
    /// Used for blackout on shutdown; does not mark anything dirty.
    pub fn blackout(&mut self) {
        self.store.zero_all();
        self.overrides.clear_all();
        self.tracker.clear();
    }

    /// Record the scene currently live
    pub fn set_active_scene(&mut self, scene: impl Into<ActiveSceneId>) {
        self.active_scene = Some(scene.into());
    }

    /// Scene currently live, if any
    pub fn active_scene(&self) -> Option<&ActiveSceneId> {
        self.active_scene.as_ref()
    }

    /// Forget the live scene
    pub fn clear_active_scene(&mut self) {
        self.active_scene = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirty::DirtySnapshot;

    #[test]
    fn test_set_value_marks_dirty_once() {
        let mut state = ChannelState::new(2);
        assert!(state.set_channel_value(1, 1, 10));
        state.tracker_mut().clear();

        assert!(!state.set_channel_value(1, 1, 10));
        assert!(!state.tracker().is_dirty());
    }

    #[test]
    fn test_unknown_universe_leaves_tracker_clean() {
        let mut state = ChannelState::new(2);
        assert!(!state.set_channel_value(5, 1, 10));
        assert!(!state.set_channel_override(5, 1, 10));
        assert!(!state.clear_channel_override(5, 1));
        assert_eq!(state.tracker().snapshot(), DirtySnapshot::Clean);
    }

    #[test]
    fn test_override_precedence_and_revert() {
        let mut state = ChannelState::new(1);
        state.set_channel_override(1, 1, 100);
        state.set_channel_value(1, 1, 50);
        assert_eq!(state.universe_output(1)[0], 100);
        // Base read ignores overrides
        assert_eq!(state.get_channel_value(1, 1), 50);

        assert!(state.clear_channel_override(1, 1));
        assert_eq!(state.universe_output(1)[0], 50);
    }

    #[test]
    fn test_clear_all_overrides_marks_affected_only() {
        let mut state = ChannelState::new(3);
        assert!(!state.clear_all_overrides());
        assert!(!state.tracker().is_dirty());

        state.set_channel_override(1, 1, 10);
        state.set_channel_override(3, 2, 20);
        state.tracker_mut().clear();

        assert!(state.clear_all_overrides());
        assert_eq!(state.tracker().snapshot(), DirtySnapshot::Dirty(vec![1, 3]));
    }

    #[test]
    fn test_universe_channels_not_found() {
        let state = ChannelState::new(1);
        assert!(state.universe_channels(2).is_none());
        assert_eq!(state.universe_output(2), [0u8; DMX_CHANNELS]);
    }

    #[test]
    fn test_all_universe_outputs() {
        let mut state = ChannelState::new(2);
        state.set_channel_value(2, 3, 33);
        state.set_channel_override(1, 1, 11);

        let outputs = state.all_universe_outputs();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].universe, 1);
        assert_eq!(outputs[0].channels[0], 11);
        assert_eq!(outputs[1].channels[2], 33);
        assert!(outputs.iter().all(|o| o.channels.len() == DMX_CHANNELS));
    }

    #[test]
    fn test_blackout() {
        let mut state = ChannelState::new(2);
        state.set_channel_value(1, 1, 255);
        state.set_channel_override(2, 1, 255);
        state.blackout();

        assert_eq!(state.get_channel_value(1, 1), 0);
        assert_eq!(state.universe_output(2), [0u8; DMX_CHANNELS]);
        assert!(!state.tracker().is_dirty());
    }

    #[test]
    fn test_active_scene_pass_through() {
        let mut state = ChannelState::new(1);
        assert!(state.active_scene().is_none());
        state.set_active_scene("scene-42");
        assert_eq!(state.active_scene().map(|s| s.as_str()), Some("scene-42"));
        state.clear_active_scene();
        assert!(state.active_scene().is_none());
    }
}
