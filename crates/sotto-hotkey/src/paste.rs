//! Paste injection into a target window.
//!
//! Delivers a synthetic Ctrl+V to the window captured when the hotkey fired,
//! forcing OS foreground focus onto it first if some other window has taken
//! focus since. Focus forcing can fail in several ways (permission denied,
//! thread attach refused); all of them are diagnostics only and injection
//! proceeds best-effort, landing wherever focus actually ends up.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::WindowHandle;

/// Time for the OS to apply a forced focus change before keys are injected.
#[cfg(target_os = "windows")]
const FOREGROUND_SETTLE: Duration = Duration::from_millis(200);

/// Time for the unconditional modifier release to drain from the input queue.
#[cfg(target_os = "windows")]
const MODIFIER_RELEASE_SETTLE: Duration = Duration::from_millis(50);

#[cfg(not(target_os = "windows"))]
const KEYSTROKE_SETTLE: Duration = Duration::from_millis(10);

/// Time for the target application to consume the pasted text before the
/// previous clipboard contents are put back.
const CLIPBOARD_RESTORE_DELAY: Duration = Duration::from_millis(1000);

/// A request to paste into a specific window.
#[derive(Debug, Clone)]
pub struct PasteJob {
    /// Window captured at hotkey-press time. A null handle pastes into
    /// whatever currently has focus.
    pub target: WindowHandle,
    /// Clipboard text to put back once the paste has settled.
    pub restore: Option<String>,
}

/// Whether delivering the paste requires stealing the OS foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
enum FocusPlan {
    /// The target already owns the foreground (or none was given).
    Keep,
    /// Focus must be forced onto the target first.
    Force,
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn focus_plan(target: WindowHandle, foreground: WindowHandle) -> FocusPlan {
    if target.is_null() || target == foreground {
        FocusPlan::Keep
    } else {
        FocusPlan::Force
    }
}

/// Spawns a worker that performs paste jobs and returns the sender used to
/// submit them. Injection involves blocking settle delays, so it lives on
/// its own thread and the caller's send returns immediately, once the job is
/// dispatched rather than once the target application has processed it.
pub fn spawn_paste_task() -> Sender<PasteJob> {
    let (sender, receiver) = mpsc::channel::<PasteJob>();
    thread::spawn(move || run_worker(receiver));
    sender
}

#[cfg(target_os = "windows")]
fn run_worker(receiver: Receiver<PasteJob>) {
    while let Ok(job) = receiver.recv() {
        windows::paste_into(job.target);
        restore_clipboard(job.restore);
    }
}

fn restore_clipboard(restore: Option<String>) {
    let Some(previous) = restore else {
        return;
    };
    thread::sleep(CLIPBOARD_RESTORE_DELAY);
    if let Err(e) = crate::clipboard::copy_text(&previous) {
        warn!("failed to restore clipboard text: {}", e);
    }
}

/// Enigo is not Send, so it stays parked in the worker thread. There is no
/// foreground forcing off Windows; the paste lands in the focused window.
#[cfg(not(target_os = "windows"))]
fn run_worker(receiver: Receiver<PasteJob>) {
    use enigo::{Enigo, Settings};

    let mut enigo = match Enigo::new(&Settings::default()) {
        Ok(enigo) => enigo,
        Err(e) => {
            warn!("paste worker unavailable: {}", e);
            return;
        }
    };

    while let Ok(job) = receiver.recv() {
        if let Err(e) = paste_chord(&mut enigo) {
            warn!("failed to paste transcription: {}", e);
        }
        restore_clipboard(job.restore);
    }
}

#[cfg(not(target_os = "windows"))]
fn paste_chord(enigo: &mut enigo::Enigo) -> Result<(), enigo::InputError> {
    use enigo::Direction::{Click, Press, Release};
    use enigo::{Key, Keyboard};

    #[cfg(target_os = "macos")]
    let paste_modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let paste_modifier = Key::Control;

    enigo.key(paste_modifier, Press)?;
    thread::sleep(KEYSTROKE_SETTLE);
    enigo.key(Key::Unicode('v'), Click)?;
    thread::sleep(KEYSTROKE_SETTLE);
    enigo.key(paste_modifier, Release)?;

    Ok(())
}

#[cfg(target_os = "windows")]
mod windows {
    use std::thread;

    use tracing::{debug, warn};
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
        keybd_event, AttachThreadInput, KEYEVENTF_KEYUP,
    };
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        AllowSetForegroundWindow, BringWindowToTop, GetForegroundWindow,
        GetWindowThreadProcessId, SetForegroundWindow, ShowWindow, SW_RESTORE,
    };

    use super::{focus_plan, FocusPlan, FOREGROUND_SETTLE, MODIFIER_RELEASE_SETTLE};
    use crate::keys::{
        VK_CTRL, VK_LALT, VK_LCTRL, VK_LSHIFT, VK_LWIN, VK_RALT, VK_RCTRL, VK_RSHIFT, VK_RWIN,
        VK_V,
    };
    use crate::WindowHandle;

    pub(super) fn paste_into(target: WindowHandle) {
        let foreground = WindowHandle(unsafe { GetForegroundWindow() });
        if focus_plan(target, foreground) == FocusPlan::Force {
            force_foreground(target, foreground);
            thread::sleep(FOREGROUND_SETTLE);
        } else {
            debug!(?target, "target window already in foreground");
        }

        release_modifiers();
        thread::sleep(MODIFIER_RELEASE_SETTLE);
        send_paste_chord();
        debug!(?target, "paste keystroke injected");
    }

    /// Cooperate with the current foreground owner to get around the OS
    /// foreground lock: allow the target's process to take focus, bridge the
    /// two windows' input threads, then request activation.
    fn force_foreground(target: WindowHandle, foreground: WindowHandle) {
        let mut target_pid = 0u32;
        let target_thread = unsafe { GetWindowThreadProcessId(target.0, &mut target_pid) };
        let foreground_thread =
            unsafe { GetWindowThreadProcessId(foreground.0, std::ptr::null_mut()) };

        if unsafe { AllowSetForegroundWindow(target_pid) } == 0 {
            debug!(target_pid, "AllowSetForegroundWindow refused");
        }

        let _bridge = InputBridge::attach(foreground_thread, target_thread);

        unsafe {
            BringWindowToTop(target.0);
            ShowWindow(target.0, SW_RESTORE);
        }
        if unsafe { SetForegroundWindow(target.0) } == 0 {
            warn!(
                ?target,
                "could not bring target window to the foreground, pasting anyway"
            );
        }
        // The bridge detaches when it drops, on every path.
    }

    /// Scoped attachment of two threads' input processing. The OS only
    /// permits a background process to move focus while the threads share an
    /// input queue; detaching must happen whether or not activation worked.
    struct InputBridge {
        from: u32,
        to: u32,
        attached: bool,
    }

    impl InputBridge {
        fn attach(from: u32, to: u32) -> Self {
            let attached = from != to && unsafe { AttachThreadInput(from, to, 1) } != 0;
            if from != to && !attached {
                debug!(from, to, "input thread attach refused");
            }
            Self { from, to, attached }
        }
    }

    impl Drop for InputBridge {
        fn drop(&mut self) {
            if self.attached {
                unsafe { AttachThreadInput(self.from, self.to, 0) };
            }
        }
    }

    /// Release every modifier at the OS level so the injected chord cannot
    /// be corrupted by a key the user is still physically holding (for
    /// example the Win key that triggered the hotkey).
    fn release_modifiers() {
        const MODIFIERS: [u16; 8] = [
            VK_LWIN, VK_RWIN, VK_LCTRL, VK_RCTRL, VK_LSHIFT, VK_RSHIFT, VK_LALT, VK_RALT,
        ];
        for vk in MODIFIERS {
            unsafe { keybd_event(vk as u8, 0, KEYEVENTF_KEYUP, 0) };
        }
    }

    fn send_paste_chord() {
        unsafe {
            keybd_event(VK_CTRL as u8, 0, 0, 0);
            keybd_event(VK_V as u8, 0, 0, 0);
            keybd_event(VK_V as u8, 0, KEYEVENTF_KEYUP, 0);
            keybd_event(VK_CTRL as u8, 0, KEYEVENTF_KEYUP, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_kept_when_target_is_foreground() {
        let window = WindowHandle(42);
        assert_eq!(focus_plan(window, window), FocusPlan::Keep);
    }

    #[test]
    fn test_focus_kept_for_null_target() {
        assert_eq!(
            focus_plan(WindowHandle::NULL, WindowHandle(42)),
            FocusPlan::Keep
        );
    }

    #[test]
    fn test_focus_forced_when_target_differs() {
        assert_eq!(
            focus_plan(WindowHandle(42), WindowHandle(7)),
            FocusPlan::Force
        );
    }
}
