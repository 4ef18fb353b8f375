//! Lecture persistence.
//!
//! Row-oriented storage for the lecture aggregate: a `lectures` root row
//! owning speakers, transcript segments, exactly one full-text row, and at
//! most one insights row. The store exposes insert, fetch, and delete only;
//! nothing in the pipeline ever updates a row in place.

mod sqlite;

pub use sqlite::{LectureStore, SEGMENT_BATCH_SIZE};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The durable lecture root row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LectureRecord {
    /// Assigned once, at creation, by the uploader. Never reused.
    pub id: Uuid,
    pub title: String,
    pub professor: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub duration_seconds: i64,
    pub class_number: String,
    pub language: String,
}

/// One ordered speaker attached to a lecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerRecord {
    pub speaker_name: String,
    /// 1-based position.
    pub speaker_order: i64,
}

/// One transcript segment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub speaker_name: Option<String>,
    /// Dense 1-based sequence matching chronological order.
    pub segment_order: i64,
}

/// The insights row: four independently generated columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsRecord {
    pub summary: String,
    pub key_terms: Vec<String>,
    pub main_ideas: Vec<String>,
    pub review_questions: Vec<String>,
}

/// A lecture with all of its child rows, as fetched back from the store.
#[derive(Debug, Clone)]
pub struct CompleteLecture {
    pub lecture: LectureRecord,
    pub speakers: Vec<SpeakerRecord>,
    pub segments: Vec<SegmentRecord>,
    pub full_text: String,
    pub insights: Option<InsightsRecord>,
}

/// Summary row for listings.
#[derive(Debug, Clone)]
pub struct LectureSummary {
    pub id: Uuid,
    pub title: String,
    pub class_number: String,
    pub date: String,
    pub duration_seconds: i64,
}
