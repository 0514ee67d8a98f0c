//! Global hotkey capture and paste injection.
//!
//! This crate owns the system-wide keyboard subscription: it tracks modifier
//! state, matches or records hotkey combinations, and can later force a
//! synthetic paste keystroke into the window that was focused when the hotkey
//! fired.
//!
//! The state machines ([`HotkeyMatcher`], [`HotkeyRecorder`], [`EngineState`])
//! are pure and platform-free; the OS hook and the injection live in thin
//! adapters ([`HookEngine`], [`spawn_paste_task`]) that are only functional on
//! Windows. On other platforms the hook reports
//! [`HotkeyError::Unsupported`] and pasting falls back to a plain synthetic
//! Ctrl/Cmd+V without focus forcing.

pub mod clipboard;
mod engine;
mod hook;
pub mod keys;
mod matcher;
mod modifiers;
mod paste;
mod recorder;

use thiserror::Error;

pub use engine::{EngineOutput, EngineState, Mode};
pub use hook::HookEngine;
pub use matcher::{HotkeyMatcher, MatchTransition};
pub use modifiers::ModifierTracker;
pub use paste::{spawn_paste_task, PasteJob};
pub use recorder::{HotkeyRecorder, RecordedCombo};
pub use sotto_core::HotkeyBinding;

/// Errors that can occur in the hotkey subsystem.
#[derive(Debug, Error)]
pub enum HotkeyError {
    /// The OS refused to install the keyboard hook. The feature is
    /// unavailable for this run; the rest of the application continues.
    #[error("failed to install keyboard hook: {0}")]
    HookInstall(String),

    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),

    #[error("global keyboard hooks are not supported on this platform")]
    Unsupported,
}

/// A single observed key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Virtual-key code as reported by the OS.
    pub vk: u16,
    /// True for key-down, false for key-up.
    pub pressed: bool,
}

impl KeyEvent {
    pub fn down(vk: u16) -> Self {
        Self { vk, pressed: true }
    }

    pub fn up(vk: u16) -> Self {
        Self { vk, pressed: false }
    }
}

/// Whether the observed event is passed on to the rest of the OS input
/// pipeline or swallowed by the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Forward,
    Suppress,
}

/// Opaque identity of an OS window. Captured when a hotkey fires and handed
/// back to the paste injector at stop time; never cached by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Events emitted by the hook engine, consumed by the dictation controller.
#[derive(Debug, Clone)]
pub enum HotkeyEvent {
    /// The hotkey went down. Carries the window that was in the foreground
    /// at that instant, which is where the transcript will be pasted.
    Pressed { target: WindowHandle },
    /// The hotkey was released or the combination was broken.
    Released,
    /// A recording session captured a new combination.
    Recorded { binding: HotkeyBinding, label: String },
}
