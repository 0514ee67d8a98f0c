//! Model management for local Whisper transcription.
//!
//! This module handles downloading, locating, and managing Whisper models.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use sotto_core::models_dir;
use tracing::{info, warn};

/// Base URL for downloading Whisper models from Hugging Face.
const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Available Whisper model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhisperModel {
    /// Tiny multilingual model (~75 MB), fastest, basic quality
    Tiny,
    /// Tiny English-only model (~75 MB)
    TinyEn,
    /// Base multilingual model (~142 MB) - recommended default
    Base,
    /// Base English-only model (~142 MB)
    BaseEn,
    /// Small multilingual model (~466 MB)
    Small,
    /// Small English-only model (~466 MB)
    SmallEn,
    /// Medium multilingual model (~1.5 GB)
    Medium,
    /// Medium English-only model (~1.5 GB)
    MediumEn,
    /// Large v3 turbo model (~1.5 GB) - best speed/quality ratio
    LargeV3Turbo,
}

impl WhisperModel {
    /// Returns the filename for this model.
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Tiny => "ggml-tiny.bin",
            Self::TinyEn => "ggml-tiny.en.bin",
            Self::Base => "ggml-base.bin",
            Self::BaseEn => "ggml-base.en.bin",
            Self::Small => "ggml-small.bin",
            Self::SmallEn => "ggml-small.en.bin",
            Self::Medium => "ggml-medium.bin",
            Self::MediumEn => "ggml-medium.en.bin",
            Self::LargeV3Turbo => "ggml-large-v3-turbo.bin",
        }
    }

    /// Returns the download URL for this model.
    pub fn url(&self) -> String {
        format!("{}/{}", MODEL_BASE_URL, self.filename())
    }

    /// Returns the approximate size of this model in bytes.
    pub fn size_bytes(&self) -> u64 {
        match self {
            Self::Tiny | Self::TinyEn => 75_000_000,
            Self::Base | Self::BaseEn => 142_000_000,
            Self::Small | Self::SmallEn => 466_000_000,
            Self::Medium | Self::MediumEn => 1_500_000_000,
            Self::LargeV3Turbo => 1_500_000_000,
        }
    }

    /// Returns a human-readable size string.
    pub fn size_human(&self) -> &'static str {
        match self {
            Self::Tiny | Self::TinyEn => "~75 MB",
            Self::Base | Self::BaseEn => "~142 MB",
            Self::Small | Self::SmallEn => "~466 MB",
            Self::Medium | Self::MediumEn => "~1.5 GB",
            Self::LargeV3Turbo => "~1.5 GB",
        }
    }

    /// Parses a model name string into a WhisperModel.
    ///
    /// Accepts names like "base", "tiny.en", "large-v3-turbo", etc.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "tiny" => Some(Self::Tiny),
            "tiny.en" | "tiny-en" => Some(Self::TinyEn),
            "base" => Some(Self::Base),
            "base.en" | "base-en" => Some(Self::BaseEn),
            "small" => Some(Self::Small),
            "small.en" | "small-en" => Some(Self::SmallEn),
            "medium" => Some(Self::Medium),
            "medium.en" | "medium-en" => Some(Self::MediumEn),
            "large-v3-turbo" | "large" | "turbo" => Some(Self::LargeV3Turbo),
            _ => None,
        }
    }
}

impl Default for WhisperModel {
    fn default() -> Self {
        Self::Base
    }
}

/// Returns the path where a model should be stored.
pub fn model_path(model: WhisperModel) -> Result<PathBuf> {
    Ok(models_dir()?.join(model.filename()))
}

/// Checks if a model exists locally.
pub fn model_exists(model: WhisperModel) -> Result<bool> {
    let path = model_path(model)?;
    Ok(path.exists())
}

/// Downloads a model to the local models directory.
///
/// The `progress_callback` is called periodically with (bytes_downloaded, total_bytes).
pub async fn download_model<F>(model: WhisperModel, progress_callback: F) -> Result<PathBuf>
where
    F: Fn(u64, u64) + Send + 'static,
{
    let path = model_path(model)?;

    // Create models directory if it doesn't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create models directory: {:?}", parent))?;
    }

    let url = model.url();
    info!(model = ?model, url = %url, "Downloading Whisper model");

    let client = reqwest::Client::new();
    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to start download from {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to download model: HTTP {}", response.status());
    }

    let total_size = response.content_length().unwrap_or(model.size_bytes());

    // Download to a temporary file first, then rename
    let temp_path = path.with_extension("bin.tmp");
    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    use futures_util::StreamExt;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| "Failed to read chunk during download")?;
        file.write_all(&chunk)
            .with_context(|| "Failed to write chunk to file")?;
        downloaded += chunk.len() as u64;
        progress_callback(downloaded, total_size);
    }

    file.flush().with_context(|| "Failed to flush file")?;
    drop(file);

    // Rename temp file to final path
    fs::rename(&temp_path, &path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    info!(path = ?path, "Model download complete");
    Ok(path)
}

/// Ensures a model is available locally, downloading it if necessary.
///
/// Returns the path to the model file.
pub async fn ensure_model<F>(model: WhisperModel, progress_callback: F) -> Result<PathBuf>
where
    F: Fn(u64, u64) + Send + 'static,
{
    if model_exists(model)? {
        info!(model = ?model, "Model already exists locally");
        return model_path(model);
    }

    warn!(
        model = ?model,
        size = model.size_human(),
        "Model not found locally, downloading..."
    );

    download_model(model, progress_callback).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_from_name() {
        assert_eq!(WhisperModel::from_name("base"), Some(WhisperModel::Base));
        assert_eq!(
            WhisperModel::from_name("tiny.en"),
            Some(WhisperModel::TinyEn)
        );
        assert_eq!(
            WhisperModel::from_name("turbo"),
            Some(WhisperModel::LargeV3Turbo)
        );
        assert_eq!(WhisperModel::from_name("invalid"), None);
    }

    #[test]
    fn test_model_urls() {
        let model = WhisperModel::Base;
        assert!(model.url().contains("ggml-base.bin"));
        assert!(model.url().starts_with("https://"));
    }
}
