// Re-export from sub-crates
pub use sotto_audio::{Recorder, RecorderError, Recording, RecordingHandle};
pub use sotto_core::{
    Config, ConfigManager, HotkeyBinding, MicState, APP_NAME, APP_NAME_PRETTY, DEFAULT_LOG_LEVEL,
};
pub use sotto_hotkey::{clipboard, spawn_paste_task, HookEngine, HotkeyEvent, PasteJob, WindowHandle};
pub use sotto_transcribe::{
    OpenAIClient, OpenAIConfig, TranscribeError, Transcriber, Transcription,
};

// App-specific modules
pub mod event;
pub mod icon;
pub mod notify;
pub mod process;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
