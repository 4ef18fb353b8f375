//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// A raw segment as returned by the speech engine, before filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Transcribed text, possibly with surrounding whitespace.
    pub text: String,
}

/// A canonical transcript segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds. Always greater than `start_seconds`.
    pub end_seconds: f64,
    /// Trimmed, non-empty text.
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text,
        }
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// A normalized transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Surviving segments in original order.
    pub segments: Vec<TranscriptSegment>,
    /// Space-joined text of the surviving segments. Built from the filtered
    /// list, not the engine's own concatenation, so dropped segments leave
    /// no stray joins.
    pub full_text: String,
}

impl Transcript {
    /// Normalize raw engine output: drop segments with `end <= start`
    /// (malformed timing) and segments whose text is empty after trimming.
    pub fn normalize(raw: Vec<EngineSegment>) -> Self {
        let segments: Vec<TranscriptSegment> = raw
            .into_iter()
            .filter(|s| s.end > s.start)
            .filter_map(|s| {
                let text = s.text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(TranscriptSegment::new(s.start, s.end, text.to_string()))
                }
            })
            .collect();

        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            segments,
            full_text,
        }
    }

    /// Total spoken time: the sum of segment durations. Silence between
    /// segments is not counted.
    pub fn duration_seconds(&self) -> f64 {
        self.segments.iter().map(|s| s.duration()).sum()
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_filters_malformed_and_empty() {
        let raw = vec![
            EngineSegment {
                start: 0.0,
                end: 5.0,
                text: " Hello world ".to_string(),
            },
            EngineSegment {
                start: 5.0,
                end: 5.0, // end <= start
                text: "dropped".to_string(),
            },
            EngineSegment {
                start: 6.0,
                end: 4.0, // end < start
                text: "also dropped".to_string(),
            },
            EngineSegment {
                start: 5.0,
                end: 10.0,
                text: "   ".to_string(), // whitespace only
            },
            EngineSegment {
                start: 10.0,
                end: 15.0,
                text: "This is a test".to_string(),
            },
        ];

        let transcript = Transcript::normalize(raw);
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text, "Hello world");
        assert_eq!(transcript.segments[1].text, "This is a test");
        assert_eq!(transcript.full_text, "Hello world This is a test");
    }

    #[test]
    fn test_duration_is_sum_of_segment_durations() {
        let raw = vec![
            EngineSegment {
                start: 0.0,
                end: 5.0,
                text: "a".to_string(),
            },
            EngineSegment {
                // Gap from 5.0 to 8.0 is not counted.
                start: 8.0,
                end: 10.5,
                text: "b".to_string(),
            },
        ];

        let transcript = Transcript::normalize(raw);
        assert!((transcript.duration_seconds() - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_input_yields_empty_transcript() {
        let transcript = Transcript::normalize(vec![]);
        assert!(transcript.segments.is_empty());
        assert_eq!(transcript.full_text, "");
        assert_eq!(transcript.duration_seconds(), 0.0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.0), "01:05");
        assert_eq!(format_timestamp(3665.0), "01:01:05");
    }
}
