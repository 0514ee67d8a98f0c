//! Tray icon rendering.
//!
//! Icons are simple filled dots rendered in memory, recolored per state.

use std::sync::LazyLock;

use crate::MicState;

const ICON_SIZE: u32 = 32;

const COLOR_IDLE: (u8, u8, u8) = (128, 128, 128);
const COLOR_ACTIVATING: (u8, u8, u8) = (255, 223, 0);
const COLOR_ACTIVE: (u8, u8, u8) = (0, 255, 0);
const COLOR_PROCESSING: (u8, u8, u8) = (64, 156, 255);

static ICON: LazyLock<tray_icon::Icon> = LazyLock::new(|| render_icon(COLOR_IDLE));
static ICON_ACTIVATING: LazyLock<tray_icon::Icon> =
    LazyLock::new(|| render_icon(COLOR_ACTIVATING));
static ICON_ACTIVE: LazyLock<tray_icon::Icon> = LazyLock::new(|| render_icon(COLOR_ACTIVE));
static ICON_PROCESSING: LazyLock<tray_icon::Icon> =
    LazyLock::new(|| render_icon(COLOR_PROCESSING));

/// Extension trait mapping mic state to its tray icon.
pub trait StateIcon {
    fn icon(&self) -> tray_icon::Icon;
}

impl StateIcon for MicState {
    fn icon(&self) -> tray_icon::Icon {
        match self {
            MicState::Idle => ICON.clone(),
            MicState::Activating => ICON_ACTIVATING.clone(),
            MicState::Active => ICON_ACTIVE.clone(),
            MicState::Processing => ICON_PROCESSING.clone(),
        }
    }
}

fn render_icon((r, g, b): (u8, u8, u8)) -> tray_icon::Icon {
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;
    let radius = ICON_SIZE as f32 / 2.0 - 2.0;

    let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);
    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let alpha = if (dx * dx + dy * dy).sqrt() <= radius {
                255
            } else {
                0
            };
            rgba.extend_from_slice(&[r, g, b, alpha]);
        }
    }

    tray_icon::Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE).expect("Failed to build icon")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icons_render() {
        // Building each state icon must not panic.
        for state in [
            MicState::Idle,
            MicState::Activating,
            MicState::Active,
            MicState::Processing,
        ] {
            let _ = state.icon();
        }
    }
}
