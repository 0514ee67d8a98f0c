//! Normal-mode hotkey matching.

use sotto_core::HotkeyBinding;

use crate::keys::is_modifier;
use crate::modifiers::ModifierTracker;
use crate::{Decision, KeyEvent};

/// Edge transitions of the configured hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTransition {
    Pressed,
    Released,
}

/// Decides whether the live key state satisfies the configured binding and
/// emits de-duplicated `Pressed`/`Released` transitions.
///
/// The matcher cycles between idle and active for the lifetime of the hook;
/// repeated key-downs from OS key-repeat never re-emit `Pressed`.
#[derive(Debug, Clone)]
pub struct HotkeyMatcher {
    binding: HotkeyBinding,
    active: bool,
}

impl HotkeyMatcher {
    pub fn new(binding: HotkeyBinding) -> Self {
        Self {
            binding: binding.sanitized(),
            active: false,
        }
    }

    /// Replace the binding. Takes effect on the next event; an in-flight
    /// activation is not retroactively altered.
    pub fn set_binding(&mut self, binding: HotkeyBinding) {
        self.binding = binding.sanitized();
    }

    pub fn binding(&self) -> HotkeyBinding {
        self.binding
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed one key event. `mods` must already reflect this event.
    pub fn on_key(
        &mut self,
        event: KeyEvent,
        mods: &ModifierTracker,
    ) -> (Option<MatchTransition>, Decision) {
        match self.binding.key {
            None => self.on_key_modifiers_only(event, mods),
            Some(vk) => self.on_key_with_key(vk, event, mods),
        }
    }

    fn on_key_modifiers_only(
        &mut self,
        event: KeyEvent,
        mods: &ModifierTracker,
    ) -> (Option<MatchTransition>, Decision) {
        if event.pressed && is_modifier(event.vk) && self.required_held(mods) && !self.active {
            self.active = true;
            // Swallow the completing modifier of a Win combo so the OS
            // start-menu handling never sees it.
            let decision = if self.binding.win {
                Decision::Suppress
            } else {
                Decision::Forward
            };
            return (Some(MatchTransition::Pressed), decision);
        }

        if !event.pressed && self.active && is_modifier(event.vk) && self.required_missing(mods) {
            self.active = false;
            return (Some(MatchTransition::Released), Decision::Forward);
        }

        (None, Decision::Forward)
    }

    fn on_key_with_key(
        &mut self,
        hotkey_vk: u16,
        event: KeyEvent,
        mods: &ModifierTracker,
    ) -> (Option<MatchTransition>, Decision) {
        // Releasing a required modifier before the key breaks the combo.
        if !event.pressed && self.active && self.required_missing(mods) {
            self.active = false;
            return (Some(MatchTransition::Released), Decision::Forward);
        }

        if event.vk != hotkey_vk {
            return (None, Decision::Forward);
        }

        let suppress_win = if self.binding.win {
            Decision::Suppress
        } else {
            Decision::Forward
        };

        // A bare key with no required modifier is never treated as the global
        // hotkey; it would hijack ordinary typing.
        if event.pressed
            && self.required_held(mods)
            && self.binding.any_modifier()
            && !self.active
        {
            self.active = true;
            (Some(MatchTransition::Pressed), suppress_win)
        } else if !event.pressed && self.active {
            self.active = false;
            (Some(MatchTransition::Released), suppress_win)
        } else if mods.win && self.binding.win {
            // Key repeat of the hotkey while a Win combo is held: keep it
            // away from the OS even though no transition fires.
            (None, Decision::Suppress)
        } else {
            (None, Decision::Forward)
        }
    }

    fn required_held(&self, mods: &ModifierTracker) -> bool {
        (!self.binding.ctrl || mods.ctrl)
            && (!self.binding.shift || mods.shift)
            && (!self.binding.alt || mods.alt)
            && (!self.binding.win || mods.win)
    }

    fn required_missing(&self, mods: &ModifierTracker) -> bool {
        (self.binding.ctrl && !mods.ctrl)
            || (self.binding.shift && !mods.shift)
            || (self.binding.alt && !mods.alt)
            || (self.binding.win && !mods.win)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{VK_LCTRL, VK_LSHIFT, VK_LWIN};

    const VK_D: u16 = 0x44;

    /// Applies the event to the tracker first, then the matcher, mirroring
    /// the hook engine's per-event ordering.
    fn step(
        matcher: &mut HotkeyMatcher,
        mods: &mut ModifierTracker,
        event: KeyEvent,
    ) -> (Option<MatchTransition>, Decision) {
        mods.apply(event.vk, event.pressed);
        matcher.on_key(event, mods)
    }

    #[test]
    fn test_ctrl_win_d_fires_once() {
        let binding = HotkeyBinding::empty().with_ctrl().with_win().with_key(VK_D);
        let mut matcher = HotkeyMatcher::new(binding);
        let mut mods = ModifierTracker::default();

        assert_eq!(step(&mut matcher, &mut mods, KeyEvent::down(VK_LCTRL)).0, None);
        assert_eq!(step(&mut matcher, &mut mods, KeyEvent::down(VK_LWIN)).0, None);
        let (transition, decision) = step(&mut matcher, &mut mods, KeyEvent::down(VK_D));
        assert_eq!(transition, Some(MatchTransition::Pressed));
        assert_eq!(decision, Decision::Suppress);

        // OS key repeat: no re-emit, still suppressed while Win is held.
        let (transition, decision) = step(&mut matcher, &mut mods, KeyEvent::down(VK_D));
        assert_eq!(transition, None);
        assert_eq!(decision, Decision::Suppress);

        // Releasing a required modifier ends the activation exactly once.
        let (transition, _) = step(&mut matcher, &mut mods, KeyEvent::up(VK_LWIN));
        assert_eq!(transition, Some(MatchTransition::Released));
        let (transition, _) = step(&mut matcher, &mut mods, KeyEvent::up(VK_LCTRL));
        assert_eq!(transition, None);
    }

    #[test]
    fn test_key_release_ends_activation() {
        let binding = HotkeyBinding::empty().with_alt().with_key(VK_D);
        let mut matcher = HotkeyMatcher::new(binding);
        let mut mods = ModifierTracker::default();

        step(&mut matcher, &mut mods, KeyEvent::down(0xA4));
        let (transition, decision) = step(&mut matcher, &mut mods, KeyEvent::down(VK_D));
        assert_eq!(transition, Some(MatchTransition::Pressed));
        assert_eq!(decision, Decision::Forward);

        let (transition, _) = step(&mut matcher, &mut mods, KeyEvent::up(VK_D));
        assert_eq!(transition, Some(MatchTransition::Released));
        assert!(!matcher.is_active());
    }

    #[test]
    fn test_modifiers_only_cycle() {
        let binding = HotkeyBinding::empty().with_ctrl().with_shift();
        let mut matcher = HotkeyMatcher::new(binding);
        let mut mods = ModifierTracker::default();

        assert_eq!(step(&mut matcher, &mut mods, KeyEvent::down(VK_LCTRL)).0, None);
        let (transition, decision) = step(&mut matcher, &mut mods, KeyEvent::down(VK_LSHIFT));
        assert_eq!(transition, Some(MatchTransition::Pressed));
        assert_eq!(decision, Decision::Forward);

        let (transition, _) = step(&mut matcher, &mut mods, KeyEvent::up(VK_LSHIFT));
        assert_eq!(transition, Some(MatchTransition::Released));

        // Re-pressing from idle with Ctrl still held starts a new cycle.
        let (transition, _) = step(&mut matcher, &mut mods, KeyEvent::down(VK_LSHIFT));
        assert_eq!(transition, Some(MatchTransition::Pressed));
    }

    #[test]
    fn test_bare_key_never_matches() {
        let binding = HotkeyBinding::empty().with_key(VK_D);
        let mut matcher = HotkeyMatcher::new(binding);
        let mut mods = ModifierTracker::default();

        let (transition, decision) = step(&mut matcher, &mut mods, KeyEvent::down(VK_D));
        assert_eq!(transition, None);
        assert_eq!(decision, Decision::Forward);
    }

    #[test]
    fn test_invalid_binding_falls_back_to_default() {
        let matcher = HotkeyMatcher::new(HotkeyBinding::empty());
        assert_eq!(matcher.binding(), HotkeyBinding::default());
    }

    #[test]
    fn test_set_binding_keeps_activation() {
        let binding = HotkeyBinding::empty().with_ctrl().with_key(VK_D);
        let mut matcher = HotkeyMatcher::new(binding);
        let mut mods = ModifierTracker::default();

        step(&mut matcher, &mut mods, KeyEvent::down(VK_LCTRL));
        step(&mut matcher, &mut mods, KeyEvent::down(VK_D));
        assert!(matcher.is_active());

        matcher.set_binding(HotkeyBinding::empty().with_shift().with_key(VK_D));
        assert!(matcher.is_active());
    }

    #[test]
    fn test_win_combo_suppresses_only_triggering_events() {
        let binding = HotkeyBinding::empty().with_win().with_key(VK_D);
        let mut matcher = HotkeyMatcher::new(binding);
        let mut mods = ModifierTracker::default();

        // The Win key itself is forwarded; only the combo key is swallowed.
        let (_, decision) = step(&mut matcher, &mut mods, KeyEvent::down(VK_LWIN));
        assert_eq!(decision, Decision::Forward);
        let (transition, decision) = step(&mut matcher, &mut mods, KeyEvent::down(VK_D));
        assert_eq!(transition, Some(MatchTransition::Pressed));
        assert_eq!(decision, Decision::Suppress);
        let (transition, decision) = step(&mut matcher, &mut mods, KeyEvent::up(VK_D));
        assert_eq!(transition, Some(MatchTransition::Released));
        assert_eq!(decision, Decision::Suppress);
    }
}
