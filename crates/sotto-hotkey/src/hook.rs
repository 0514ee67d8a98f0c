//! OS-level keyboard hook ownership and event routing.
//!
//! On Windows this installs a low-level keyboard hook on a dedicated thread
//! that pumps its own message loop; the hook callback runs on that thread
//! with a strict time budget (the OS silently removes handlers that are too
//! slow), so per event it only steps the pure engine and pushes any emitted
//! event into a fire-and-forget channel.
//!
//! On non-Windows, `start` reports the feature as unavailable; the pure
//! state machines remain usable everywhere.

use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "windows")]
use std::sync::atomic::AtomicU32;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use parking_lot::Mutex;
#[cfg(target_os = "windows")]
use tracing::info;
#[cfg(not(target_os = "windows"))]
use tracing::warn;

use sotto_core::HotkeyBinding;

use crate::engine::EngineState;
use crate::{HotkeyError, HotkeyEvent};

/// State shared between the hook thread and the control surface.
struct Shared {
    state: Mutex<EngineState>,
    events: Sender<HotkeyEvent>,
}

/// Owns the lifecycle of the system-wide key subscription.
///
/// All control operations are safe from any thread and take effect on the
/// next observed key event.
pub struct HookEngine {
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    #[cfg(target_os = "windows")]
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
    #[cfg(target_os = "windows")]
    hook_thread_id: Arc<AtomicU32>,
}

impl HookEngine {
    /// Create an engine matching `binding`. Emitted events go to `events`;
    /// the send is fire-and-forget so the hook thread never waits on the
    /// consumer.
    pub fn new(binding: HotkeyBinding, events: Sender<HotkeyEvent>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::new(binding)),
                events,
            }),
            running: Arc::new(AtomicBool::new(false)),
            #[cfg(target_os = "windows")]
            thread: Mutex::new(None),
            #[cfg(target_os = "windows")]
            hook_thread_id: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Replace the active binding. In-flight activation state is kept.
    pub fn set_binding(&self, binding: HotkeyBinding) {
        self.shared.state.lock().set_binding(binding);
    }

    pub fn binding(&self) -> HotkeyBinding {
        self.shared.state.lock().binding()
    }

    /// Enter recording mode; the next captured combination is emitted as
    /// [`HotkeyEvent::Recorded`].
    pub fn start_recording(&self) {
        self.shared.state.lock().start_recording();
    }

    /// Leave recording mode without emitting. Safe to call at any time.
    pub fn cancel_recording(&self) {
        self.shared.state.lock().cancel_recording();
    }

    pub fn is_recording(&self) -> bool {
        self.shared.state.lock().is_recording()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Install the hook. Idempotent: a second `start` without an intervening
    /// [`stop`](Self::stop) is a no-op.
    #[cfg(target_os = "windows")]
    pub fn start(&self) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let running = Arc::clone(&self.running);
        let hook_thread_id = Arc::clone(&self.hook_thread_id);
        let (init_tx, init_rx) = std::sync::mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("sotto-hook".to_string())
            .spawn(move || {
                windows::run_hook_thread(shared, running, hook_thread_id, init_tx);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HotkeyError::ThreadSpawn(e.to_string())
            })?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                *self.thread.lock() = Some(handle);
                info!("keyboard hook installed");
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                handle.join().ok();
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                handle.join().ok();
                Err(HotkeyError::ThreadSpawn(
                    "hook thread exited before reporting".to_string(),
                ))
            }
        }
    }

    /// Global keyboard hooks exist only on Windows.
    #[cfg(not(target_os = "windows"))]
    pub fn start(&self) -> Result<(), HotkeyError> {
        warn!("global hotkey capture is only available on Windows");
        Err(HotkeyError::Unsupported)
    }

    /// Uninstall the hook and reset modifier state. Safe when not running.
    #[cfg(target_os = "windows")]
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let thread_id = self.hook_thread_id.load(Ordering::SeqCst);
        if thread_id != 0 {
            windows::post_quit(thread_id);
        }
        if let Some(handle) = self.thread.lock().take() {
            handle.join().ok();
        }
        self.shared.state.lock().reset_modifiers();
        info!("keyboard hook removed");
    }

    /// Stub stop.
    #[cfg(not(target_os = "windows"))]
    pub fn stop(&self) {}
}

impl Drop for HookEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(target_os = "windows")]
mod windows {
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::mpsc::Sender;
    use std::sync::Arc;

    use tracing::error;
    use windows_sys::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows_sys::Win32::System::Threading::GetCurrentThreadId;
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetForegroundWindow, GetMessageW, PostThreadMessageW,
        SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, KBDLLHOOKSTRUCT, MSG,
        WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
    };

    use super::Shared;
    use crate::engine::EngineOutput;
    use crate::{Decision, HotkeyError, HotkeyEvent, KeyEvent, WindowHandle};

    thread_local! {
        // The low-level hook delivers callbacks on the installing thread via
        // its message loop, so the hook thread can own the shared handle in a
        // thread-local and the callback needs no global lookup lock.
        static HOOK_SHARED: RefCell<Option<Arc<Shared>>> = const { RefCell::new(None) };
    }

    pub(super) fn post_quit(thread_id: u32) {
        unsafe {
            PostThreadMessageW(thread_id, WM_QUIT, 0, 0);
        }
    }

    pub(super) fn run_hook_thread(
        shared: Arc<Shared>,
        running: Arc<AtomicBool>,
        hook_thread_id: Arc<AtomicU32>,
        init_tx: Sender<Result<(), HotkeyError>>,
    ) {
        HOOK_SHARED.with(|slot| *slot.borrow_mut() = Some(Arc::clone(&shared)));

        let hook = unsafe {
            SetWindowsHookExW(
                WH_KEYBOARD_LL,
                Some(hook_callback),
                GetModuleHandleW(std::ptr::null()),
                0,
            )
        };
        if hook == 0 {
            let code = std::io::Error::last_os_error();
            HOOK_SHARED.with(|slot| *slot.borrow_mut() = None);
            running.store(false, Ordering::SeqCst);
            init_tx
                .send(Err(HotkeyError::HookInstall(code.to_string())))
                .ok();
            return;
        }

        hook_thread_id.store(unsafe { GetCurrentThreadId() }, Ordering::SeqCst);
        init_tx.send(Ok(())).ok();

        let mut msg: MSG = unsafe { std::mem::zeroed() };
        while unsafe { GetMessageW(&mut msg, 0, 0, 0) } > 0 {
            unsafe {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        if unsafe { UnhookWindowsHookEx(hook) } == 0 {
            error!("failed to remove keyboard hook");
        }
        HOOK_SHARED.with(|slot| *slot.borrow_mut() = None);
        shared.state.lock().reset_modifiers();
    }

    unsafe extern "system" fn hook_callback(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        if code < 0 {
            return unsafe { CallNextHookEx(0, code, wparam, lparam) };
        }

        let decision = HOOK_SHARED.with(|slot| {
            let borrow = slot.borrow();
            let Some(shared) = borrow.as_ref() else {
                return Decision::Forward;
            };

            let pressed = matches!(wparam as u32, WM_KEYDOWN | WM_SYSKEYDOWN);
            let released = matches!(wparam as u32, WM_KEYUP | WM_SYSKEYUP);
            if !pressed && !released {
                return Decision::Forward;
            }

            let vk = unsafe { (*(lparam as *const KBDLLHOOKSTRUCT)).vkCode } as u16;
            let (output, decision) = shared.state.lock().process(KeyEvent { vk, pressed });

            if let Some(output) = output {
                let event = match output {
                    EngineOutput::Pressed => HotkeyEvent::Pressed {
                        target: WindowHandle(unsafe { GetForegroundWindow() }),
                    },
                    EngineOutput::Released => HotkeyEvent::Released,
                    EngineOutput::Recorded(combo) => HotkeyEvent::Recorded {
                        binding: combo.binding,
                        label: combo.label,
                    },
                };
                shared.events.send(event).ok();
            }

            decision
        });

        match decision {
            Decision::Suppress => 1,
            Decision::Forward => unsafe { CallNextHookEx(0, code, wparam, lparam) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (HookEngine, std::sync::mpsc::Receiver<HotkeyEvent>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (HookEngine::new(HotkeyBinding::default(), tx), rx)
    }

    #[test]
    fn test_engine_starts_idle() {
        let (engine, _rx) = engine();
        assert!(!engine.is_running());
        assert!(!engine.is_recording());
        assert_eq!(engine.binding(), HotkeyBinding::default());
    }

    #[test]
    fn test_control_ops_without_hook() {
        let (engine, _rx) = engine();

        let binding = HotkeyBinding::empty().with_ctrl().with_shift();
        engine.set_binding(binding);
        assert_eq!(engine.binding(), binding);

        engine.start_recording();
        assert!(engine.is_recording());
        engine.cancel_recording();
        assert!(!engine.is_recording());
        // Cancelling again is a no-op.
        engine.cancel_recording();
        assert!(!engine.is_recording());
    }

    #[test]
    fn test_invalid_binding_sanitized_at_engine_boundary() {
        let (engine, _rx) = engine();
        engine.set_binding(HotkeyBinding::empty());
        assert_eq!(engine.binding(), HotkeyBinding::default());
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_start_unsupported_off_windows() {
        let (engine, _rx) = engine();
        assert!(matches!(engine.start(), Err(HotkeyError::Unsupported)));
        assert!(!engine.is_running());
        engine.stop(); // Should not panic
    }
}
