//! Transcription module for Pensum.
//!
//! Wraps the external speech-to-text engine, normalizes its output into
//! canonical timestamped segments, and persists the result as a lecture
//! aggregate.

mod models;
mod processor;
mod whisper;

pub use models::{format_timestamp, EngineSegment, Transcript, TranscriptSegment};
pub use processor::{TranscriptionOutcome, TranscriptionProcessor};
pub use whisper::WhisperEngine;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for speech-to-text engines.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Transcribe an audio file into raw engine segments. The language hint
    /// is forced, not detected.
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<Vec<EngineSegment>>;
}
