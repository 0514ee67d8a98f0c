//! Recording-mode capture of a new hotkey combination.

use sotto_core::HotkeyBinding;

use crate::keys::{binding_label, is_modifier, Modifier};
use crate::modifiers::ModifierTracker;
use crate::{Decision, KeyEvent};

/// A combination captured by a recording session, with its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCombo {
    pub binding: HotkeyBinding,
    pub label: String,
}

/// One-shot capture of the combination the user types.
///
/// Captured-modifier flags record what was pressed at any point during the
/// session, independent of what is live-held right now; they accumulate until
/// the session ends. Two ways out:
///
/// - a non-modifier key-down while at least one modifier was captured yields
///   a modifiers+key combination immediately;
/// - releasing the last live modifier yields a modifiers-only combination,
///   but only when two or more modifiers were captured. A single modifier
///   alone is too easy to hit accidentally and is silently dropped.
#[derive(Debug, Clone, Default)]
pub struct HotkeyRecorder {
    ctrl: bool,
    shift: bool,
    alt: bool,
    win: bool,
}

impl HotkeyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn captured_count(&self) -> usize {
        [self.ctrl, self.shift, self.alt, self.win]
            .iter()
            .filter(|&&captured| captured)
            .count()
    }

    fn captured_binding(&self, key: Option<u16>) -> HotkeyBinding {
        HotkeyBinding {
            ctrl: self.ctrl,
            shift: self.shift,
            alt: self.alt,
            win: self.win,
            key,
        }
    }

    fn decision(&self) -> Decision {
        // Mirror the matcher: a Win-bearing capture must not leak into the
        // OS start-menu handling.
        if self.win {
            Decision::Suppress
        } else {
            Decision::Forward
        }
    }

    /// Feed one key event. `mods` must already reflect this event.
    pub fn on_key(
        &mut self,
        event: KeyEvent,
        mods: &ModifierTracker,
    ) -> (Option<RecordedCombo>, Decision) {
        if event.pressed {
            match Modifier::from_vk(event.vk) {
                Some(Modifier::Ctrl) => self.ctrl = true,
                Some(Modifier::Shift) => self.shift = true,
                Some(Modifier::Alt) => self.alt = true,
                Some(Modifier::Win) => self.win = true,
                None => {
                    // Modifier + ordinary key completes the session at once.
                    if self.captured_count() > 0 {
                        let binding = self.captured_binding(Some(event.vk));
                        let combo = RecordedCombo {
                            label: binding_label(&binding),
                            binding,
                        };
                        return (Some(combo), self.decision());
                    }
                }
            }
            return (None, Decision::Forward);
        }

        // Modifiers-only: the session completes when the last live modifier
        // goes up, provided at least two were captured.
        if is_modifier(event.vk) && mods.all_released() && self.captured_count() >= 2 {
            let binding = self.captured_binding(None);
            let combo = RecordedCombo {
                label: binding_label(&binding),
                binding,
            };
            return (Some(combo), self.decision());
        }

        (None, Decision::Forward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{VK_LALT, VK_LCTRL, VK_LSHIFT, VK_LWIN};

    const VK_F5: u16 = 0x74;

    fn step(
        recorder: &mut HotkeyRecorder,
        mods: &mut ModifierTracker,
        event: KeyEvent,
    ) -> (Option<RecordedCombo>, Decision) {
        mods.apply(event.vk, event.pressed);
        recorder.on_key(event, mods)
    }

    #[test]
    fn test_records_modifier_plus_key() {
        let mut recorder = HotkeyRecorder::new();
        let mut mods = ModifierTracker::default();

        assert_eq!(step(&mut recorder, &mut mods, KeyEvent::down(VK_LALT)).0, None);
        let (combo, decision) = step(&mut recorder, &mut mods, KeyEvent::down(VK_F5));
        let combo = combo.unwrap();
        assert_eq!(combo.label, "Alt+F5");
        assert_eq!(
            combo.binding,
            HotkeyBinding::empty().with_alt().with_key(VK_F5)
        );
        assert_eq!(decision, Decision::Forward);
    }

    #[test]
    fn test_records_modifiers_only() {
        let mut recorder = HotkeyRecorder::new();
        let mut mods = ModifierTracker::default();

        step(&mut recorder, &mut mods, KeyEvent::down(VK_LCTRL));
        step(&mut recorder, &mut mods, KeyEvent::down(VK_LWIN));
        assert_eq!(step(&mut recorder, &mut mods, KeyEvent::up(VK_LCTRL)).0, None);
        let (combo, decision) = step(&mut recorder, &mut mods, KeyEvent::up(VK_LWIN));
        let combo = combo.unwrap();
        assert_eq!(combo.label, "Ctrl+Win");
        assert_eq!(combo.binding, HotkeyBinding::empty().with_ctrl().with_win());
        assert_eq!(combo.binding.key, None);
        assert_eq!(decision, Decision::Suppress);
    }

    #[test]
    fn test_single_modifier_is_dropped() {
        let mut recorder = HotkeyRecorder::new();
        let mut mods = ModifierTracker::default();

        step(&mut recorder, &mut mods, KeyEvent::down(VK_LCTRL));
        let (combo, _) = step(&mut recorder, &mut mods, KeyEvent::up(VK_LCTRL));
        assert_eq!(combo, None);
    }

    #[test]
    fn test_bare_key_is_ignored() {
        let mut recorder = HotkeyRecorder::new();
        let mut mods = ModifierTracker::default();

        let (combo, decision) = step(&mut recorder, &mut mods, KeyEvent::down(VK_F5));
        assert_eq!(combo, None);
        assert_eq!(decision, Decision::Forward);
    }

    #[test]
    fn test_captured_flags_accumulate_across_session() {
        // Flags record what was pressed during the session, not what is held
        // now: Ctrl down+up then Shift down+up still captures Ctrl+Shift.
        let mut recorder = HotkeyRecorder::new();
        let mut mods = ModifierTracker::default();

        step(&mut recorder, &mut mods, KeyEvent::down(VK_LCTRL));
        assert_eq!(step(&mut recorder, &mut mods, KeyEvent::up(VK_LCTRL)).0, None);
        step(&mut recorder, &mut mods, KeyEvent::down(VK_LSHIFT));
        let (combo, _) = step(&mut recorder, &mut mods, KeyEvent::up(VK_LSHIFT));
        assert_eq!(combo.unwrap().label, "Ctrl+Shift");
    }

    #[test]
    fn test_win_capture_suppresses_completing_key() {
        let mut recorder = HotkeyRecorder::new();
        let mut mods = ModifierTracker::default();

        step(&mut recorder, &mut mods, KeyEvent::down(VK_LWIN));
        let (combo, decision) = step(&mut recorder, &mut mods, KeyEvent::down(VK_F5));
        assert_eq!(combo.unwrap().label, "Win+F5");
        assert_eq!(decision, Decision::Suppress);
    }
}
