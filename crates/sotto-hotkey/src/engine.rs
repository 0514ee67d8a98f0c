//! Mode dispatch for the shared key-event stream.
//!
//! Exactly one mode is active at a time: normal matching against the
//! configured binding, or one-shot recording of a new combination. The whole
//! engine is a pure step function over key events, so the OS hook adapter
//! stays a mechanical translation layer and everything here is testable
//! without a keyboard.

use tracing::debug;

use sotto_core::HotkeyBinding;

use crate::matcher::{HotkeyMatcher, MatchTransition};
use crate::modifiers::ModifierTracker;
use crate::recorder::{HotkeyRecorder, RecordedCombo};
use crate::{Decision, KeyEvent};

/// Which handler currently consumes key events.
#[derive(Debug, Clone)]
pub enum Mode {
    Matching,
    Recording(HotkeyRecorder),
}

/// Output of one engine step, before the hook adapter decorates `Pressed`
/// with the current foreground window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutput {
    Pressed,
    Released,
    Recorded(RecordedCombo),
}

/// The complete, process-wide hotkey state: live modifiers, the matcher, and
/// the active mode. Owned exclusively by the hook engine behind a lock; all
/// mutation goes through the operations below.
#[derive(Debug)]
pub struct EngineState {
    mods: ModifierTracker,
    matcher: HotkeyMatcher,
    mode: Mode,
}

impl EngineState {
    pub fn new(binding: HotkeyBinding) -> Self {
        Self {
            mods: ModifierTracker::default(),
            matcher: HotkeyMatcher::new(binding),
            mode: Mode::Matching,
        }
    }

    /// Step the engine with one observed key event. Per event, in order:
    /// update modifier state, dispatch to the active mode, decide whether
    /// the event is forwarded to the rest of the OS input pipeline.
    pub fn process(&mut self, event: KeyEvent) -> (Option<EngineOutput>, Decision) {
        self.mods.apply(event.vk, event.pressed);

        match &mut self.mode {
            Mode::Recording(recorder) => {
                let (combo, decision) = recorder.on_key(event, &self.mods);
                match combo {
                    Some(combo) => {
                        debug!(label = %combo.label, "hotkey recorded");
                        self.mode = Mode::Matching;
                        (Some(EngineOutput::Recorded(combo)), decision)
                    }
                    None => (None, decision),
                }
            }
            Mode::Matching => {
                let (transition, decision) = self.matcher.on_key(event, &self.mods);
                let output = transition.map(|transition| match transition {
                    MatchTransition::Pressed => EngineOutput::Pressed,
                    MatchTransition::Released => EngineOutput::Released,
                });
                (output, decision)
            }
        }
    }

    /// Replace the matcher's binding. Takes effect on the next event.
    pub fn set_binding(&mut self, binding: HotkeyBinding) {
        self.matcher.set_binding(binding);
    }

    pub fn binding(&self) -> HotkeyBinding {
        self.matcher.binding()
    }

    /// Enter recording mode with fresh captured flags. Restarting an active
    /// session just resets it.
    pub fn start_recording(&mut self) {
        self.mode = Mode::Recording(HotkeyRecorder::new());
    }

    /// Leave recording mode without emitting anything. Safe to call at any
    /// time; a no-op outside a session. The matcher's activation state is
    /// untouched.
    pub fn cancel_recording(&mut self) {
        if self.is_recording() {
            debug!("hotkey recording cancelled");
        }
        self.mode = Mode::Matching;
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.mode, Mode::Recording(_))
    }

    /// Forget all live modifier state. Called on hook teardown.
    pub fn reset_modifiers(&mut self) {
        self.mods.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{VK_LCTRL, VK_LSHIFT, VK_LWIN};

    const VK_D: u16 = 0x44;
    const VK_F5: u16 = 0x74;

    fn ctrl_win_d() -> HotkeyBinding {
        HotkeyBinding::empty().with_ctrl().with_win().with_key(VK_D)
    }

    #[test]
    fn test_match_cycle_end_to_end() {
        let mut engine = EngineState::new(ctrl_win_d());

        assert_eq!(engine.process(KeyEvent::down(VK_LCTRL)).0, None);
        assert_eq!(engine.process(KeyEvent::down(VK_LWIN)).0, None);
        assert_eq!(
            engine.process(KeyEvent::down(VK_D)).0,
            Some(EngineOutput::Pressed)
        );
        // Key repeat is de-duplicated.
        assert_eq!(engine.process(KeyEvent::down(VK_D)).0, None);
        assert_eq!(
            engine.process(KeyEvent::up(VK_LWIN)).0,
            Some(EngineOutput::Released)
        );
        assert_eq!(engine.process(KeyEvent::up(VK_D)).0, None);
        assert_eq!(engine.process(KeyEvent::up(VK_LCTRL)).0, None);
    }

    #[test]
    fn test_recording_interleaves_with_matching() {
        let mut engine = EngineState::new(ctrl_win_d());

        engine.start_recording();
        assert!(engine.is_recording());

        // The configured hotkey does not fire while recording.
        engine.process(KeyEvent::down(VK_LCTRL));
        engine.process(KeyEvent::down(VK_LWIN));
        let (output, _) = engine.process(KeyEvent::down(VK_D));
        let Some(EngineOutput::Recorded(combo)) = output else {
            panic!("expected a recorded combo, got {:?}", output);
        };
        assert_eq!(combo.label, "Ctrl+Win+D");
        assert!(!engine.is_recording());

        // Recording does not implicitly rebind; the old binding still rules.
        engine.process(KeyEvent::up(VK_D));
        engine.process(KeyEvent::up(VK_LWIN));
        engine.process(KeyEvent::up(VK_LCTRL));
        engine.process(KeyEvent::down(VK_LCTRL));
        engine.process(KeyEvent::down(VK_LWIN));
        assert_eq!(
            engine.process(KeyEvent::down(VK_D)).0,
            Some(EngineOutput::Pressed)
        );
    }

    #[test]
    fn test_set_binding_takes_effect_next_event() {
        let mut engine = EngineState::new(ctrl_win_d());
        engine.set_binding(HotkeyBinding::empty().with_shift().with_key(VK_F5));

        engine.process(KeyEvent::down(VK_LSHIFT));
        assert_eq!(
            engine.process(KeyEvent::down(VK_F5)).0,
            Some(EngineOutput::Pressed)
        );
    }

    #[test]
    fn test_cancel_recording_is_idempotent() {
        let mut engine = EngineState::new(ctrl_win_d());

        // Not recording: no-op, matcher keeps working afterwards.
        engine.cancel_recording();
        engine.cancel_recording();

        engine.start_recording();
        engine.process(KeyEvent::down(VK_LCTRL));
        engine.cancel_recording();
        assert!(!engine.is_recording());

        // Nothing was emitted and matching resumed.
        engine.process(KeyEvent::up(VK_LCTRL));
        engine.process(KeyEvent::down(VK_LCTRL));
        engine.process(KeyEvent::down(VK_LWIN));
        assert_eq!(
            engine.process(KeyEvent::down(VK_D)).0,
            Some(EngineOutput::Pressed)
        );
    }

    #[test]
    fn test_modifiers_only_binding_through_engine() {
        let mut engine = EngineState::new(HotkeyBinding::empty().with_ctrl().with_shift());

        engine.process(KeyEvent::down(VK_LCTRL));
        assert_eq!(
            engine.process(KeyEvent::down(VK_LSHIFT)).0,
            Some(EngineOutput::Pressed)
        );
        assert_eq!(
            engine.process(KeyEvent::up(VK_LSHIFT)).0,
            Some(EngineOutput::Released)
        );
        // Still held Ctrl, pressing Shift again re-arms from idle.
        assert_eq!(
            engine.process(KeyEvent::down(VK_LSHIFT)).0,
            Some(EngineOutput::Pressed)
        );
    }

    #[test]
    fn test_reset_modifiers() {
        let mut engine = EngineState::new(ctrl_win_d());
        engine.process(KeyEvent::down(VK_LCTRL));
        engine.process(KeyEvent::down(VK_LWIN));
        engine.reset_modifiers();

        // With modifier state forgotten, the key alone no longer matches.
        assert_eq!(engine.process(KeyEvent::down(VK_D)).0, None);
    }
}
