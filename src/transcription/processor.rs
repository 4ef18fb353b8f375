//! Transcription stage adapter.
//!
//! Drives the speech engine, normalizes the output, and persists the lecture
//! aggregate. Persistence is transactional-in-intent: the lecture row goes in
//! first, then segments in batches, then the full text; any child failure
//! rolls the whole aggregate back before the error surfaces.

use super::{SpeechEngine, Transcript};
use crate::error::{PensumError, Result};
use crate::metadata::LectureMetadata;
use crate::orchestrator::{StageStatus, StatusTracker};
use crate::store::{LectureStore, SegmentRecord};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Result of a successful transcription stage.
#[derive(Debug, Clone)]
pub struct TranscriptionOutcome {
    /// The newly assigned lecture identifier.
    pub lecture_id: Uuid,
    /// The normalized transcript, for downstream insight generation.
    pub transcript: Transcript,
}

/// The transcription stage: engine call, normalization, persistence.
pub struct TranscriptionProcessor {
    engine: Arc<dyn SpeechEngine>,
    store: Arc<LectureStore>,
    language: String,
    status: StatusTracker,
}

impl TranscriptionProcessor {
    pub fn new(engine: Arc<dyn SpeechEngine>, store: Arc<LectureStore>, language: &str) -> Self {
        Self {
            engine,
            store,
            language: language.to_string(),
            status: StatusTracker::new(),
        }
    }

    /// Per-item status, queryable mid-run.
    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    /// Transcribe one recording and persist it as a lecture aggregate.
    ///
    /// The lecture id is assigned here, once, before the first insert.
    /// Fails with `Transcription` on engine errors and `Persistence` (after
    /// rollback) on storage errors.
    #[instrument(skip(self, metadata), fields(key = %key))]
    pub async fn process(
        &self,
        audio_path: &Path,
        metadata: &LectureMetadata,
        key: &str,
    ) -> Result<TranscriptionOutcome> {
        self.status.set(key, StageStatus::Processing);
        self.status.progress(key, "Transcribing audio...");

        let raw = match self.engine.transcribe(audio_path, &self.language).await {
            Ok(raw) => raw,
            Err(e) => {
                self.status.set(key, StageStatus::Failed);
                self.status.progress(key, &format!("Transcription failed: {}", e));
                return Err(PensumError::Transcription(e.to_string()));
            }
        };

        self.status.progress(key, "Processing transcription segments...");
        let transcript = Transcript::normalize(raw);

        if transcript.segments.is_empty() {
            self.status.set(key, StageStatus::Failed);
            return Err(PensumError::Transcription(
                "Engine produced no usable segments".to_string(),
            ));
        }

        let lecture_id = Uuid::new_v4();
        let lecture = crate::store::LectureRecord {
            id: lecture_id,
            title: metadata.title.clone(),
            professor: metadata.professor.clone(),
            date: metadata.date.clone(),
            duration_seconds: transcript.duration_seconds().round() as i64,
            class_number: metadata.class_name.clone(),
            language: "en-US".to_string(),
        };

        let segments: Vec<SegmentRecord> = transcript
            .segments
            .iter()
            .enumerate()
            .map(|(i, s)| SegmentRecord {
                start_time: s.start_seconds,
                end_time: s.end_seconds,
                text: s.text.clone(),
                // Populated once diarization exists; the column rides along.
                speaker_name: None,
                segment_order: i as i64 + 1,
            })
            .collect();

        self.status.progress(key, "Saving transcription...");
        if let Err(e) = self
            .store
            .insert_lecture(&lecture, &[], &segments, &transcript.full_text)
        {
            self.status.set(key, StageStatus::Failed);
            self.status.progress(key, &format!("Persistence failed: {}", e));
            return Err(e);
        }

        self.status.set(key, StageStatus::Completed);
        self.status.progress(key, "Transcription completed successfully");
        info!(
            "Transcribed '{}' ({} segments, lecture {})",
            metadata.title,
            transcript.segments.len(),
            lecture_id
        );

        Ok(TranscriptionOutcome {
            lecture_id,
            transcript,
        })
    }
}
