//! SQLite-backed lecture store.

use super::{
    CompleteLecture, InsightsRecord, LectureRecord, LectureSummary, SegmentRecord, SpeakerRecord,
};
use crate::error::{PensumError, Result};
use crate::reconcile::LectureIdentifier;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Maximum rows per segment insert. Kept at the remote backend's payload
/// limit so the write pattern stays portable.
pub const SEGMENT_BATCH_SIZE: usize = 500;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS lectures (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        professor TEXT NOT NULL,
        date TEXT NOT NULL,
        duration_seconds INTEGER NOT NULL,
        class_number TEXT NOT NULL,
        language TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS speakers (
        lecture_id TEXT NOT NULL REFERENCES lectures(id),
        speaker_name TEXT NOT NULL,
        speaker_order INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS transcript_segments (
        lecture_id TEXT NOT NULL REFERENCES lectures(id),
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        text TEXT NOT NULL,
        speaker_name TEXT,
        segment_order INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_segments_lecture ON transcript_segments(lecture_id);

    CREATE TABLE IF NOT EXISTS lecture_texts (
        lecture_id TEXT NOT NULL UNIQUE REFERENCES lectures(id),
        text TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS text_insights (
        lecture_id TEXT NOT NULL UNIQUE REFERENCES lectures(id),
        summary TEXT NOT NULL,
        key_terms TEXT NOT NULL,
        main_ideas TEXT NOT NULL,
        review_questions TEXT NOT NULL
    );
"#;

/// SQLite-backed store for the lecture aggregate.
pub struct LectureStore {
    conn: Mutex<Connection>,
}

impl LectureStore {
    /// Open (or create) a store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened lecture store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PensumError::Persistence(format!("Failed to acquire lock: {}", e)))
    }

    /// Insert a complete lecture aggregate: root row, speakers, segments
    /// (batched), full text.
    ///
    /// If any insert after the root row fails, every row already written for
    /// this lecture is deleted before the error surfaces. An orphaned lecture
    /// with no text is strictly worse than no lecture at all.
    #[instrument(skip_all, fields(lecture_id = %lecture.id))]
    pub fn insert_lecture(
        &self,
        lecture: &LectureRecord,
        speakers: &[SpeakerRecord],
        segments: &[SegmentRecord],
        full_text: &str,
    ) -> Result<()> {
        self.insert_lecture_row(lecture)?;

        let result = self
            .insert_speakers(&lecture.id, speakers)
            .and_then(|_| self.insert_segments(&lecture.id, segments).map(|_| ()))
            .and_then(|_| self.insert_full_text(&lecture.id, full_text));

        if let Err(e) = result {
            warn!("Lecture insert failed, rolling back: {}", e);
            self.cleanup_failed(&lecture.id);
            return Err(e);
        }

        info!("Stored lecture '{}' ({})", lecture.title, lecture.id);
        Ok(())
    }

    fn insert_lecture_row(&self, lecture: &LectureRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO lectures (id, title, professor, date, duration_seconds, class_number, language)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                lecture.id.to_string(),
                lecture.title,
                lecture.professor,
                lecture.date,
                lecture.duration_seconds,
                lecture.class_number,
                lecture.language,
            ],
        )
        .map_err(|e| PensumError::Persistence(format!("Failed to insert lecture row: {}", e)))?;
        Ok(())
    }

    fn insert_speakers(&self, lecture_id: &uuid::Uuid, speakers: &[SpeakerRecord]) -> Result<()> {
        if speakers.is_empty() {
            return Ok(());
        }

        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| PensumError::Persistence(e.to_string()))?;
        for speaker in speakers {
            tx.execute(
                "INSERT INTO speakers (lecture_id, speaker_name, speaker_order) VALUES (?1, ?2, ?3)",
                params![lecture_id.to_string(), speaker.speaker_name, speaker.speaker_order],
            )
            .map_err(|e| PensumError::Persistence(format!("Failed to insert speakers: {}", e)))?;
        }
        tx.commit()
            .map_err(|e| PensumError::Persistence(e.to_string()))?;
        Ok(())
    }

    /// Insert segments in batches of at most [`SEGMENT_BATCH_SIZE`] rows,
    /// returning the number of batches committed. A failure carries the
    /// 1-based batch index.
    fn insert_segments(&self, lecture_id: &uuid::Uuid, segments: &[SegmentRecord]) -> Result<usize> {
        if segments.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let total_batches = segments.len().div_ceil(SEGMENT_BATCH_SIZE);

        for (batch_index, batch) in segments.chunks(SEGMENT_BATCH_SIZE).enumerate() {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| PensumError::Persistence(e.to_string()))?;
            for segment in batch {
                tx.execute(
                    r#"
                    INSERT INTO transcript_segments
                    (lecture_id, start_time, end_time, text, speaker_name, segment_order)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        lecture_id.to_string(),
                        segment.start_time,
                        segment.end_time,
                        segment.text,
                        segment.speaker_name,
                        segment.segment_order,
                    ],
                )
                .map_err(|e| {
                    PensumError::Persistence(format!(
                        "Failed to insert segment batch {}/{}: {}",
                        batch_index + 1,
                        total_batches,
                        e
                    ))
                })?;
            }
            tx.commit()
                .map_err(|e| PensumError::Persistence(e.to_string()))?;
            debug!("Inserted segment batch {}/{}", batch_index + 1, total_batches);
        }

        Ok(total_batches)
    }

    fn insert_full_text(&self, lecture_id: &uuid::Uuid, full_text: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO lecture_texts (lecture_id, text) VALUES (?1, ?2)",
            params![lecture_id.to_string(), full_text],
        )
        .map_err(|e| PensumError::Persistence(format!("Failed to insert full text: {}", e)))?;
        Ok(())
    }

    /// Insert the insights row. At most one per lecture; the UNIQUE
    /// constraint rejects a second insert.
    #[instrument(skip(self, insights))]
    pub fn insert_insights(&self, lecture_id: &uuid::Uuid, insights: &InsightsRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO text_insights (lecture_id, summary, key_terms, main_ideas, review_questions)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                lecture_id.to_string(),
                insights.summary,
                serde_json::to_string(&insights.key_terms)?,
                serde_json::to_string(&insights.main_ideas)?,
                serde_json::to_string(&insights.review_questions)?,
            ],
        )
        .map_err(|e| PensumError::Persistence(format!("Failed to insert insights: {}", e)))?;

        info!("Stored insights for lecture {}", lecture_id);
        Ok(())
    }

    /// Delete every row belonging to a lecture, children first.
    ///
    /// Used both for rollback after a failed insert and for explicit
    /// deletion. Errors here are logged, not propagated: cleanup runs while
    /// an earlier error is already in flight.
    pub fn cleanup_failed(&self, lecture_id: &uuid::Uuid) {
        let conn = match self.lock() {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Cleanup could not acquire connection: {}", e);
                return;
            }
        };

        let id = lecture_id.to_string();
        let statements = [
            "DELETE FROM text_insights WHERE lecture_id = ?1",
            "DELETE FROM lecture_texts WHERE lecture_id = ?1",
            "DELETE FROM transcript_segments WHERE lecture_id = ?1",
            "DELETE FROM speakers WHERE lecture_id = ?1",
            "DELETE FROM lectures WHERE id = ?1",
        ];
        for statement in statements {
            if let Err(e) = conn.execute(statement, params![id]) {
                warn!("Cleanup statement failed: {}", e);
            }
        }
        info!("Cleaned up rows for lecture {}", lecture_id);
    }

    /// Identifiers of every persisted lecture, for reconciliation.
    pub fn list_identifiers(&self) -> Result<Vec<LectureIdentifier>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT date, class_number FROM lectures")?;
        let rows = stmt.query_map([], |row| {
            let date: String = row.get(0)?;
            let class: String = row.get(1)?;
            Ok(LectureIdentifier::new(&date, &class))
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Summary rows for all lectures, newest first.
    pub fn list_lectures(&self) -> Result<Vec<LectureSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, class_number, date, duration_seconds
            FROM lectures
            ORDER BY date DESC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;
            Ok(LectureSummary {
                id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
                title: row.get(1)?,
                class_number: row.get(2)?,
                date: row.get(3)?,
                duration_seconds: row.get(4)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Fetch a lecture aggregate by id. Returns `None` when no root row
    /// exists.
    #[instrument(skip(self))]
    pub fn fetch_lecture(&self, lecture_id: &uuid::Uuid) -> Result<Option<CompleteLecture>> {
        let conn = self.lock()?;
        let id = lecture_id.to_string();

        let lecture = conn
            .query_row(
                "SELECT id, title, professor, date, duration_seconds, class_number, language FROM lectures WHERE id = ?1",
                params![id],
                |row| {
                    let id_str: String = row.get(0)?;
                    Ok(LectureRecord {
                        id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
                        title: row.get(1)?,
                        professor: row.get(2)?,
                        date: row.get(3)?,
                        duration_seconds: row.get(4)?,
                        class_number: row.get(5)?,
                        language: row.get(6)?,
                    })
                },
            )
            .optional()?;

        let lecture = match lecture {
            Some(l) => l,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            "SELECT speaker_name, speaker_order FROM speakers WHERE lecture_id = ?1 ORDER BY speaker_order",
        )?;
        let speakers: Vec<SpeakerRecord> = stmt
            .query_map(params![id], |row| {
                Ok(SpeakerRecord {
                    speaker_name: row.get(0)?,
                    speaker_order: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        let mut stmt = conn.prepare(
            r#"
            SELECT start_time, end_time, text, speaker_name, segment_order
            FROM transcript_segments
            WHERE lecture_id = ?1
            ORDER BY segment_order
            "#,
        )?;
        let segments: Vec<SegmentRecord> = stmt
            .query_map(params![id], |row| {
                Ok(SegmentRecord {
                    start_time: row.get(0)?,
                    end_time: row.get(1)?,
                    text: row.get(2)?,
                    speaker_name: row.get(3)?,
                    segment_order: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        let full_text: String = conn
            .query_row(
                "SELECT text FROM lecture_texts WHERE lecture_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or_default();

        let insights = conn
            .query_row(
                "SELECT summary, key_terms, main_ideas, review_questions FROM text_insights WHERE lecture_id = ?1",
                params![id],
                |row| {
                    let summary: String = row.get(0)?;
                    let key_terms: String = row.get(1)?;
                    let main_ideas: String = row.get(2)?;
                    let review_questions: String = row.get(3)?;
                    Ok((summary, key_terms, main_ideas, review_questions))
                },
            )
            .optional()?
            .map(|(summary, key_terms, main_ideas, review_questions)| InsightsRecord {
                summary,
                key_terms: serde_json::from_str(&key_terms).unwrap_or_default(),
                main_ideas: serde_json::from_str(&main_ideas).unwrap_or_default(),
                review_questions: serde_json::from_str(&review_questions).unwrap_or_default(),
            });

        Ok(Some(CompleteLecture {
            lecture,
            speakers,
            segments,
            full_text,
            insights,
        }))
    }

    /// Whether an insights row already exists for a lecture.
    pub fn has_insights(&self, lecture_id: &uuid::Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM text_insights WHERE lecture_id = ?1",
            params![lecture_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_lecture(id: Uuid) -> LectureRecord {
        LectureRecord {
            id,
            title: "Capital Budgeting".to_string(),
            professor: "Dr. Larsen".to_string(),
            date: "2024-03-05".to_string(),
            duration_seconds: 4980,
            class_number: "MBA 520 Business Finance".to_string(),
            language: "en-US".to_string(),
        }
    }

    fn sample_segments(count: usize) -> Vec<SegmentRecord> {
        (0..count)
            .map(|i| SegmentRecord {
                start_time: i as f64 * 5.0,
                end_time: (i + 1) as f64 * 5.0,
                text: format!("segment {}", i + 1),
                speaker_name: None,
                segment_order: i as i64 + 1,
            })
            .collect()
    }

    #[test]
    fn test_insert_and_fetch_round_trip() {
        let store = LectureStore::in_memory().unwrap();
        let id = Uuid::new_v4();

        store
            .insert_lecture(&sample_lecture(id), &[], &sample_segments(3), "full text here")
            .unwrap();

        let fetched = store.fetch_lecture(&id).unwrap().unwrap();
        assert_eq!(fetched.lecture.title, "Capital Budgeting");
        assert_eq!(fetched.segments.len(), 3);
        assert_eq!(fetched.segments[0].segment_order, 1);
        assert_eq!(fetched.segments[2].text, "segment 3");
        assert_eq!(fetched.full_text, "full text here");
        assert!(fetched.insights.is_none());
    }

    #[test]
    fn test_segment_insert_commits_in_batches() {
        // 1,200 rows at a batch size of 500 commit as exactly three
        // batches of 500, 500, then 200.
        let store = LectureStore::in_memory().unwrap();
        let id = Uuid::new_v4();
        store.insert_lecture_row(&sample_lecture(id)).unwrap();

        let batches = store.insert_segments(&id, &sample_segments(1200)).unwrap();
        assert_eq!(batches, 3);

        let conn = store.conn.lock().unwrap();
        let row_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM transcript_segments WHERE lecture_id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(row_count, 1200);
    }

    #[test]
    fn test_large_insert_preserves_order() {
        let store = LectureStore::in_memory().unwrap();
        let id = Uuid::new_v4();

        store
            .insert_lecture(&sample_lecture(id), &[], &sample_segments(1200), "text")
            .unwrap();

        let fetched = store.fetch_lecture(&id).unwrap().unwrap();
        assert_eq!(fetched.segments.len(), 1200);
        for (i, segment) in fetched.segments.iter().enumerate() {
            assert_eq!(segment.segment_order, i as i64 + 1);
        }
    }

    #[test]
    fn test_rollback_on_failed_child_insert() {
        let store = LectureStore::in_memory().unwrap();
        let id = Uuid::new_v4();

        // Plant a conflicting full-text row so the final child insert fails
        // after the lecture row and segments have been written. The bundled
        // SQLite enforces foreign keys by default, so enforcement is paused
        // while the stray row is planted and restored before the real insert.
        {
            let conn = store.conn.lock().unwrap();
            conn.execute_batch("PRAGMA foreign_keys=OFF;").unwrap();
            conn.execute(
                "INSERT INTO lecture_texts (lecture_id, text) VALUES (?1, 'stray')",
                params![id.to_string()],
            )
            .unwrap();
            conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        }

        let result = store.insert_lecture(&sample_lecture(id), &[], &sample_segments(10), "text");
        assert!(matches!(result, Err(PensumError::Persistence(_))));

        // The lecture row was rolled back along with everything else.
        assert!(store.fetch_lecture(&id).unwrap().is_none());
        let conn = store.conn.lock().unwrap();
        let segment_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM transcript_segments WHERE lecture_id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(segment_count, 0);
    }

    #[test]
    fn test_insights_insert_once() {
        let store = LectureStore::in_memory().unwrap();
        let id = Uuid::new_v4();
        store
            .insert_lecture(&sample_lecture(id), &[], &sample_segments(1), "text")
            .unwrap();

        let insights = InsightsRecord {
            summary: "A summary".to_string(),
            key_terms: vec!["NPV".to_string(), "IRR".to_string()],
            main_ideas: vec!["Idea".to_string()],
            review_questions: vec!["Question?".to_string()],
        };

        assert!(!store.has_insights(&id).unwrap());
        store.insert_insights(&id, &insights).unwrap();
        assert!(store.has_insights(&id).unwrap());
        assert!(store.insert_insights(&id, &insights).is_err());

        let fetched = store.fetch_lecture(&id).unwrap().unwrap();
        let stored = fetched.insights.unwrap();
        assert_eq!(stored.key_terms, vec!["NPV", "IRR"]);
    }

    #[test]
    fn test_list_identifiers_for_reconciliation() {
        let store = LectureStore::in_memory().unwrap();
        let id = Uuid::new_v4();
        store
            .insert_lecture(&sample_lecture(id), &[], &sample_segments(1), "text")
            .unwrap();

        let identifiers = store.list_identifiers().unwrap();
        assert_eq!(identifiers.len(), 1);
        assert_eq!(
            identifiers[0].as_str(),
            "2024-03-05: MBA 520 Business Finance"
        );
    }

    #[test]
    fn test_speakers_round_trip() {
        let store = LectureStore::in_memory().unwrap();
        let id = Uuid::new_v4();
        let speakers = vec![
            SpeakerRecord {
                speaker_name: "Dr. Larsen".to_string(),
                speaker_order: 1,
            },
            SpeakerRecord {
                speaker_name: "Guest".to_string(),
                speaker_order: 2,
            },
        ];

        store
            .insert_lecture(&sample_lecture(id), &speakers, &sample_segments(1), "text")
            .unwrap();

        let fetched = store.fetch_lecture(&id).unwrap().unwrap();
        assert_eq!(fetched.speakers.len(), 2);
        assert_eq!(fetched.speakers[0].speaker_name, "Dr. Larsen");
    }
}
