//! Processing pipeline for recorded audio. Accepts finished recordings and
//! carries them through transcription, reporting results back to the event
//! loop.

use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::RwLock;
use tao::event_loop::EventLoopProxy;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use sotto_audio::Recording;
use sotto_transcribe::{OpenAIClient, OpenAIConfig, TranscribeError, Transcriber, Transcription};

use crate::event::SottoEvent;
use crate::{Config, MicState};

/// Processing pipeline for audio data. This accepts finished recordings and
/// performs the processing pipeline stages on them, carrying each one from
/// transcription to the event loop.
pub struct AudioPipeline {
    runtime: Runtime,
    transcriber: Option<Arc<dyn Transcriber>>,
    config: Arc<RwLock<Config>>,
    transcription_handles: mpsc::UnboundedSender<TranscriptionTask>,
}

type TranscriptionTask = tokio::task::JoinHandle<TranscriptionOutcome>;

pub enum SubmitResult {
    Sent,
    Discarded,
}

impl AudioPipeline {
    /// Create a new pipeline instance.
    pub fn new(
        config: Arc<RwLock<Config>>,
        event_sender: EventLoopProxy<SottoEvent>,
    ) -> anyhow::Result<Self> {
        // Set up tokio runtime
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        let transcriber = build_transcriber(&config.read());
        if transcriber.is_none() {
            warn!("No transcription backend configured. Set openai_key in the config.");
        }

        // Fetch the local model ahead of first use so the first dictation
        // doesn't stall on a download.
        #[cfg(feature = "local-whisper")]
        if let Some(model) = config
            .read()
            .model()
            .and_then(sotto_transcribe::WhisperModel::from_name)
        {
            runtime.spawn(async move {
                let result = sotto_transcribe::ensure_model(model, |downloaded, total| {
                    tracing::trace!(downloaded, total, "model download progress");
                })
                .await;
                if let Err(e) = result {
                    error!("Failed to fetch whisper model: {:#}", e);
                }
            });
        }

        // Start the results collector.
        let transcription_handles = start_results_collector(&runtime, event_sender)?;

        Ok(Self {
            runtime,
            transcriber,
            config,
            transcription_handles,
        })
    }

    /// Submits a new recording to the processing pipeline. This is
    /// non-blocking and all recordings will be processed in order.
    pub fn submit(&self, recording: Recording) -> anyhow::Result<SubmitResult> {
        info!(
            samples = recording.samples(),
            bytes = recording.data().len(),
            length_seconds = recording.duration().as_secs_f64(),
            "audio submitted"
        );

        if recording.duration() < self.config.read().discard_duration() {
            info!(discard_duration = ?self.config.read().discard_duration(), "discarding recording");
            return Ok(SubmitResult::Discarded);
        }

        let Some(transcriber) = self.transcriber.clone() else {
            return Err(anyhow!("no transcription backend configured"));
        };
        let config = self.config.clone();

        // Spawn a new task to handle the transcription
        let handle = self
            .runtime
            .spawn(transcribe(transcriber, config, recording));

        // Send the transcription task to the collector
        self.transcription_handles.send(handle)?;
        Ok(SubmitResult::Sent)
    }
}

/// Pick the transcription backend from config: a local whisper model when
/// the feature is enabled and the configured model names one, otherwise the
/// OpenAI API when a key is present.
fn build_transcriber(config: &Config) -> Option<Arc<dyn Transcriber>> {
    #[cfg(feature = "local-whisper")]
    if let Some(model) = config
        .model()
        .and_then(sotto_transcribe::WhisperModel::from_name)
    {
        let local = sotto_transcribe::LocalWhisperClient::new(
            sotto_transcribe::LocalWhisperConfig::new(model),
        );
        return Some(Arc::new(local));
    }

    let key = config.key_openai()?;
    let mut openai = OpenAIConfig::new(key);
    if let Some(model) = config.model() {
        openai = openai.with_model(model);
    }
    Some(Arc::new(OpenAIClient::new(openai)))
}

/// Helper to call the transcription backend with retries and collect some
/// basic stats.
async fn transcribe(
    transcriber: Arc<dyn Transcriber>,
    config: Arc<RwLock<Config>>,
    recording: Recording,
) -> TranscriptionOutcome {
    let audio = recording.into_data();
    let bytes = audio.len();
    let (language, retries) = {
        let config = config.read();
        (config.language().map(String::from), config.retries)
    };

    let mut attempts_left = retries;
    let mut result = transcriber.transcribe(&audio, language.as_deref()).await;
    while result.is_err() && attempts_left > 0 {
        warn!("Retrying transcription, previous error: {:?}", result);
        result = transcriber.transcribe(&audio, language.as_deref()).await;
        attempts_left -= 1;
    }

    let transcription = match result {
        Ok(transcription) => transcription,
        Err(error) => {
            return TranscriptionOutcome::RetryError {
                retries,
                error,
                data: audio,
            }
        }
    };

    let mb_per_second =
        bytes as f64 / (1024.0 * 1024.0) / transcription.duration.as_secs_f64().max(f64::EPSILON);
    info!(
        backend = transcriber.name(),
        duration = ?transcription.duration,
        mb_per_second = mb_per_second,
        language = ?transcription.language,
        "transcription completed"
    );

    TranscriptionOutcome::Success(transcription)
}

enum TranscriptionOutcome {
    Success(Transcription),
    RetryError {
        retries: u8,
        error: TranscribeError,
        data: Vec<u8>,
    },
}

fn start_results_collector(
    runtime: &Runtime,
    event_sender: EventLoopProxy<SottoEvent>,
) -> anyhow::Result<mpsc::UnboundedSender<TranscriptionTask>> {
    let (task_sender, mut task_receiver) = tokio::sync::mpsc::unbounded_channel();

    runtime.spawn(async move {
        while let Some(task) = task_receiver.recv().await {
            match task.await {
                Ok(TranscriptionOutcome::Success(transcription)) => {
                    info!("Transcription: {}", transcription.text);
                    event_sender
                        .send_event(SottoEvent::TranscriptReady(transcription))
                        .ok();
                }
                Ok(TranscriptionOutcome::RetryError {
                    retries,
                    error,
                    data,
                }) => {
                    error!(
                        "Transcription failed after {} retries: {:?}",
                        retries, error
                    );
                    event_sender
                        .send_event(SottoEvent::StateChanged(MicState::Idle))
                        .ok();
                    event_sender.send_event(SottoEvent::AudioError(data)).ok();
                }
                Err(e) => {
                    error!("Error joining audio handler: {:?}", e);
                }
            }
        }

        error!("Results collector task ended unexpectedly");
    });

    Ok(task_sender)
}
