//! OS clipboard access.
//!
//! Uses the native clipboard directly (via arboard) rather than any UI
//! toolkit, so it works even when no window of ours is focused.

use arboard::Clipboard;

/// Replace the clipboard's text content.
pub fn copy_text(text: &str) -> Result<(), arboard::Error> {
    Clipboard::new()?.set_text(text.to_owned())
}

/// Read the clipboard's text content.
pub fn read_text() -> Result<String, arboard::Error> {
    Clipboard::new()?.get_text()
}
