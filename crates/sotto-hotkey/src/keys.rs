//! Virtual-key codes, modifier classification, and display names.

use sotto_core::HotkeyBinding;

// Generic modifier aliases. The OS reports these from `GetKeyState`-style
// queries and some injected events; the low-level hook usually reports the
// left/right variants below.
pub const VK_SHIFT: u16 = 0x10;
pub const VK_CTRL: u16 = 0x11;
pub const VK_ALT: u16 = 0x12;

pub const VK_SPACE: u16 = 0x20;
pub const VK_V: u16 = 0x56;

pub const VK_LWIN: u16 = 0x5B;
pub const VK_RWIN: u16 = 0x5C;

pub const VK_LSHIFT: u16 = 0xA0;
pub const VK_RSHIFT: u16 = 0xA1;
pub const VK_LCTRL: u16 = 0xA2;
pub const VK_RCTRL: u16 = 0xA3;
pub const VK_LALT: u16 = 0xA4;
pub const VK_RALT: u16 = 0xA5;

pub const VK_F1: u16 = 0x70;
pub const VK_F12: u16 = 0x7B;

const VK_0: u16 = 0x30;
const VK_9: u16 = 0x39;
const VK_A: u16 = 0x41;
const VK_Z: u16 = 0x5A;

/// The four modifiers a hotkey can require. Left/right variants and the
/// generic alias of a key all collapse to the same modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Win,
}

impl Modifier {
    /// Classify a virtual-key code as a modifier, if it is one.
    pub fn from_vk(vk: u16) -> Option<Modifier> {
        match vk {
            VK_LCTRL | VK_RCTRL | VK_CTRL => Some(Modifier::Ctrl),
            VK_LSHIFT | VK_RSHIFT | VK_SHIFT => Some(Modifier::Shift),
            VK_LALT | VK_RALT | VK_ALT => Some(Modifier::Alt),
            VK_LWIN | VK_RWIN => Some(Modifier::Win),
            _ => None,
        }
    }
}

/// Whether the virtual-key code is any modifier key.
pub fn is_modifier(vk: u16) -> bool {
    Modifier::from_vk(vk).is_some()
}

/// Human-readable name for a key. Letters and digits map to themselves,
/// function keys to "F<n>", space to "Space", anything else to its hex code.
pub fn key_name(vk: u16) -> String {
    match vk {
        VK_A..=VK_Z | VK_0..=VK_9 => char::from(vk as u8).to_string(),
        VK_F1..=VK_F12 => format!("F{}", vk - VK_F1 + 1),
        VK_SPACE => "Space".to_string(),
        _ => format!("0x{:02X}", vk),
    }
}

/// Display label for a binding: the required modifiers in Ctrl, Shift, Alt,
/// Win order, then the key name if any, joined with "+".
pub fn binding_label(binding: &HotkeyBinding) -> String {
    let mut parts = Vec::new();
    if binding.ctrl {
        parts.push("Ctrl".to_string());
    }
    if binding.shift {
        parts.push("Shift".to_string());
    }
    if binding.alt {
        parts.push("Alt".to_string());
    }
    if binding.win {
        parts.push("Win".to_string());
    }
    if let Some(vk) = binding.key {
        parts.push(key_name(vk));
    }
    parts.join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_variants_collapse() {
        assert_eq!(Modifier::from_vk(VK_LCTRL), Some(Modifier::Ctrl));
        assert_eq!(Modifier::from_vk(VK_RCTRL), Some(Modifier::Ctrl));
        assert_eq!(Modifier::from_vk(VK_CTRL), Some(Modifier::Ctrl));
        assert_eq!(Modifier::from_vk(VK_LWIN), Some(Modifier::Win));
        assert_eq!(Modifier::from_vk(VK_RWIN), Some(Modifier::Win));
        assert_eq!(Modifier::from_vk(VK_V), None);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(0x44), "D");
        assert_eq!(key_name(0x37), "7");
        assert_eq!(key_name(VK_F1), "F1");
        assert_eq!(key_name(0x74), "F5");
        assert_eq!(key_name(VK_F12), "F12");
        assert_eq!(key_name(VK_SPACE), "Space");
        assert_eq!(key_name(0x1B), "0x1B");
    }

    #[test]
    fn test_binding_label_order() {
        let binding = HotkeyBinding::empty().with_win().with_ctrl().with_key(0x44);
        assert_eq!(binding_label(&binding), "Ctrl+Win+D");
    }

    #[test]
    fn test_binding_label_modifiers_only() {
        let binding = HotkeyBinding::empty().with_ctrl().with_shift();
        assert_eq!(binding_label(&binding), "Ctrl+Shift");
    }
}
