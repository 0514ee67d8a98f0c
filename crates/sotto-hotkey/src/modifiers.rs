//! Live modifier key state, derived from observed key events.

use crate::keys::Modifier;

/// Tracks which of the four modifiers are currently held, irrespective of
/// left/right variant. Fed every key event by the hook engine; keys that are
/// not modifiers leave it untouched.
///
/// Known limitation: a modifier that was already held when the hook was
/// installed is invisible until its key-up arrives, so `false` means "not
/// known to be down", not "never pressed". Edge-triggered decisions must come
/// from observed transitions, never from polling instantaneous key state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierTracker {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub win: bool,
}

impl ModifierTracker {
    /// Update state from a key transition. Non-modifier keys are ignored.
    pub fn apply(&mut self, vk: u16, pressed: bool) {
        match Modifier::from_vk(vk) {
            Some(Modifier::Ctrl) => self.ctrl = pressed,
            Some(Modifier::Shift) => self.shift = pressed,
            Some(Modifier::Alt) => self.alt = pressed,
            Some(Modifier::Win) => self.win = pressed,
            None => {}
        }
    }

    /// Whether the given modifier is currently known to be held.
    pub fn is_down(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Ctrl => self.ctrl,
            Modifier::Shift => self.shift,
            Modifier::Alt => self.alt,
            Modifier::Win => self.win,
        }
    }

    /// Whether no modifier is currently known to be held.
    pub fn all_released(&self) -> bool {
        !self.ctrl && !self.shift && !self.alt && !self.win
    }

    /// Forget everything. Called on hook teardown.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{VK_CTRL, VK_LCTRL, VK_LSHIFT, VK_LWIN, VK_RCTRL, VK_V};

    #[test]
    fn test_tracks_down_and_up() {
        let mut mods = ModifierTracker::default();
        mods.apply(VK_LCTRL, true);
        assert!(mods.ctrl);
        mods.apply(VK_LCTRL, false);
        assert!(!mods.ctrl);
    }

    #[test]
    fn test_variants_share_state() {
        let mut mods = ModifierTracker::default();
        mods.apply(VK_LCTRL, true);
        // The generic alias releases the same boolean the left variant set.
        mods.apply(VK_CTRL, false);
        assert!(!mods.ctrl);

        mods.apply(VK_RCTRL, true);
        assert!(mods.ctrl);
    }

    #[test]
    fn test_non_modifiers_ignored() {
        let mut mods = ModifierTracker::default();
        mods.apply(VK_V, true);
        assert_eq!(mods, ModifierTracker::default());
    }

    #[test]
    fn test_state_equals_net_parity_of_sequence() {
        // For any sequence, the final state is the last observed transition
        // per modifier.
        let mut mods = ModifierTracker::default();
        let sequence = [
            (VK_LCTRL, true),
            (VK_LSHIFT, true),
            (VK_V, true),
            (VK_V, false),
            (VK_LSHIFT, false),
            (VK_LWIN, true),
        ];
        for (vk, pressed) in sequence {
            mods.apply(vk, pressed);
        }
        assert!(mods.ctrl);
        assert!(!mods.shift);
        assert!(!mods.alt);
        assert!(mods.win);
    }

    #[test]
    fn test_reset() {
        let mut mods = ModifierTracker::default();
        mods.apply(VK_LWIN, true);
        mods.reset();
        assert!(mods.all_released());
    }
}
