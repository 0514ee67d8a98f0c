//! Hotkey binding value type.
//!
//! A binding is an immutable value: the matcher receives a whole new one on
//! every update rather than mutating the old one in place.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Virtual-key code of the default activation key (`D`).
pub const DEFAULT_KEY: u16 = 0x44;

/// A hotkey combination: required modifier keys plus an optional ordinary key.
///
/// `key == None` means the binding consists of modifiers alone (for example
/// Ctrl+Win). A binding with no modifiers and no key can never fire; it is
/// replaced by [`HotkeyBinding::default`] at the configuration boundary, see
/// [`HotkeyBinding::sanitized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct HotkeyBinding {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub win: bool,
    /// Virtual-key code of the non-modifier key, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<u16>,
}

impl Default for HotkeyBinding {
    /// Win+D, the out-of-the-box hotkey.
    fn default() -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: false,
            win: false,
            key: None,
        }
        .with_win()
        .with_key(DEFAULT_KEY)
    }
}

impl HotkeyBinding {
    /// A binding with no modifiers and no key. Only useful as a builder seed.
    pub fn empty() -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: false,
            win: false,
            key: None,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_win(mut self) -> Self {
        self.win = true;
        self
    }

    pub fn with_key(mut self, vk: u16) -> Self {
        self.key = Some(vk);
        self
    }

    /// Whether at least one modifier is required.
    pub fn any_modifier(&self) -> bool {
        self.ctrl || self.shift || self.alt || self.win
    }

    /// A binding is meaningful if it requires at least one modifier or names
    /// a key.
    pub fn is_valid(&self) -> bool {
        self.any_modifier() || self.key.is_some()
    }

    /// Returns `self` if meaningful, otherwise the default binding.
    pub fn sanitized(self) -> Self {
        if self.is_valid() {
            self
        } else {
            warn!("hotkey binding has no modifiers and no key, using default");
            Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_win_d() {
        let binding = HotkeyBinding::default();
        assert!(binding.win);
        assert!(!binding.ctrl);
        assert_eq!(binding.key, Some(DEFAULT_KEY));
        assert!(binding.is_valid());
    }

    #[test]
    fn test_modifiers_only_is_valid() {
        let binding = HotkeyBinding::empty().with_ctrl().with_win();
        assert!(binding.is_valid());
        assert_eq!(binding.key, None);
    }

    #[test]
    fn test_bare_key_is_valid() {
        let binding = HotkeyBinding::empty().with_key(0x70);
        assert!(binding.is_valid());
        assert!(!binding.any_modifier());
    }

    #[test]
    fn test_empty_binding_sanitizes_to_default() {
        let binding = HotkeyBinding::empty();
        assert!(!binding.is_valid());
        assert_eq!(binding.sanitized(), HotkeyBinding::default());
    }

    #[test]
    fn test_valid_binding_survives_sanitize() {
        let binding = HotkeyBinding::empty().with_alt().with_key(0x74);
        assert_eq!(binding.sanitized(), binding);
    }
}
