//! Application events for the tao event loop.

use sotto_hotkey::HotkeyEvent;
use sotto_transcribe::Transcription;

use crate::MicState;

/// Events for the tao event loop.
#[derive(Debug, Clone)]
pub enum SottoEvent {
    /// The microphone state has changed
    StateChanged(MicState),
    /// A transcription is ready
    TranscriptReady(Transcription),
    /// The global hotkey engine emitted something
    Hotkey(HotkeyEvent),
    /// An error occurred during audio processing; carries the audio that
    /// could not be transcribed
    AudioError(Vec<u8>),
}
