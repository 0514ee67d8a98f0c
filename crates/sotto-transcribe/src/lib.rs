//! Transcription backend library for sotto.
//!
//! This crate provides a trait-based abstraction for audio transcription,
//! with implementations for OpenAI's transcription API and local Whisper
//! models.

mod openai;

#[cfg(feature = "local-whisper")]
mod local;
#[cfg(feature = "local-whisper")]
mod model;

use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "local-whisper")]
pub use local::{LocalWhisperClient, LocalWhisperConfig};
#[cfg(feature = "local-whisper")]
pub use model::{download_model, ensure_model, model_exists, model_path, WhisperModel};
pub use openai::{OpenAIClient, OpenAIConfig};
use thiserror::Error;

/// Errors that can occur during transcription.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("No API key configured")]
    NoApiKey,

    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
}

/// Result type for transcription operations.
pub type Result<T> = std::result::Result<T, TranscribeError>;

/// The outcome of a transcription: the text, how long the engine took, and
/// the language it worked in (when known).
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub duration: Duration,
    pub language: Option<String>,
}

/// Trait for transcription backends.
///
/// Implement this trait to add new transcription backends (e.g., local
/// whisper, other cloud providers, etc.)
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio to text.
    ///
    /// # Arguments
    /// * `audio` - Raw audio data (WAV) as bytes
    /// * `language` - Optional language hint (ISO 639-1 code, e.g., "en")
    async fn transcribe(&self, audio: &[u8], language: Option<&str>) -> Result<Transcription>;

    /// Returns the name of this transcriber for logging/debugging.
    fn name(&self) -> &str;
}
