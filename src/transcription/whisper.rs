//! OpenAI Whisper speech engine implementation.

use super::{EngineSegment, SpeechEngine};
use crate::error::{PensumError, Result};
use crate::openai::create_client;
use async_openai::types::{
    AudioResponseFormat, CreateTranscriptionRequestArgs, TimestampGranularity,
};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// OpenAI Whisper-based speech engine.
pub struct WhisperEngine {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl WhisperEngine {
    /// Create a new Whisper engine with the default model.
    pub fn new() -> Self {
        Self::with_model("whisper-1")
    }

    /// Create a new Whisper engine with a specific model.
    pub fn with_model(model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
        }
    }
}

impl Default for WhisperEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechEngine for WhisperEngine {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<Vec<EngineSegment>> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(async_openai::types::AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.wav")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .language(language)
            .response_format(AudioResponseFormat::VerboseJson)
            .timestamp_granularities(vec![
                TimestampGranularity::Word,
                TimestampGranularity::Segment,
            ])
            .build()
            .map_err(|e| PensumError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| PensumError::OpenAI(format!("Whisper API error: {}", e)))?;

        // Segment-level timing from the verbose JSON response; fall back to a
        // single whole-file segment if the engine omitted segments.
        let segments: Vec<EngineSegment> = response
            .segments
            .map(|segs| {
                segs.iter()
                    .map(|s| EngineSegment {
                        start: s.start as f64,
                        end: s.end as f64,
                        text: s.text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![EngineSegment {
                    start: 0.0,
                    end: response.duration as f64,
                    text: response.text.clone(),
                }]
            });

        debug!("Engine returned {} segments", segments.len());
        Ok(segments)
    }
}
