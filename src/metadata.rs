//! Per-class lecture metadata lookup.
//!
//! Each class has a JSON document in the metadata directory mapping dates to
//! lecture titles. Lookups never fail: a generic title is recoverable later,
//! a recording dropped over a missing file is not.

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Display metadata for one lecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureMetadata {
    pub title: String,
    pub class_name: String,
    pub professor: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
}

impl LectureMetadata {
    /// Synthesized defaults used whenever the lookup document is missing or
    /// unusable.
    pub fn fallback(class_name: &str, date: &str) -> Self {
        Self {
            title: format!("{} Lecture", class_name),
            class_name: class_name.to_string(),
            professor: "Professor".to_string(),
            date: date.to_string(),
        }
    }

    /// Remote filename for the backed-up audio:
    /// `<date>_<title with spaces as underscores>.mp3`.
    pub fn derived_filename(&self) -> String {
        format!("{}_{}.mp3", self.date, self.title.replace(' ', "_"))
    }
}

/// Shape of a per-class metadata document:
/// `{ "professor": "...", "lecture_titles": { "<date>": "<title>" } }`.
#[derive(Debug, Deserialize)]
struct ClassDocument {
    professor: Option<String>,
    #[serde(default)]
    lecture_titles: std::collections::HashMap<String, String>,
}

/// Loads lecture metadata from per-class JSON documents.
pub struct MetadataLoader {
    metadata_dir: std::path::PathBuf,
}

impl MetadataLoader {
    pub fn new(metadata_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            metadata_dir: metadata_dir.into(),
        }
    }

    /// Resolve a class and date to display metadata.
    ///
    /// Missing file, missing key, malformed document: every failure path
    /// returns the synthesized defaults.
    pub fn load(&self, class_name: &str, date: &str) -> LectureMetadata {
        let path = self.metadata_dir.join(format!("{}.json", class_name));

        let doc = match Self::read_document(&path) {
            Some(doc) => doc,
            None => {
                warn!(
                    "No usable metadata for '{}' ({}), using defaults",
                    class_name,
                    path.display()
                );
                return LectureMetadata::fallback(class_name, date);
            }
        };

        let mut metadata = LectureMetadata::fallback(class_name, date);
        if let Some(professor) = doc.professor {
            metadata.professor = professor;
        }
        match doc.lecture_titles.get(date) {
            Some(title) => metadata.title = title.clone(),
            None => debug!("No title on record for {} {}", class_name, date),
        }
        metadata
    }

    fn read_document(path: &Path) -> Option<ClassDocument> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let loader = MetadataLoader::new(dir.path());

        let metadata = loader.load("MBA 520 Business Finance", "2024-03-05");
        assert_eq!(metadata.title, "MBA 520 Business Finance Lecture");
        assert_eq!(metadata.professor, "Professor");
        assert_eq!(metadata.date, "2024-03-05");
    }

    #[test]
    fn test_full_document_lookup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("MBA 520 Business Finance.json"),
            r#"{
                "professor": "Dr. Larsen",
                "lecture_titles": { "2024-03-05": "Capital Budgeting" }
            }"#,
        )
        .unwrap();

        let loader = MetadataLoader::new(dir.path());
        let metadata = loader.load("MBA 520 Business Finance", "2024-03-05");
        assert_eq!(metadata.title, "Capital Budgeting");
        assert_eq!(metadata.professor, "Dr. Larsen");
    }

    #[test]
    fn test_missing_date_keeps_professor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("MBA 505 Leadership.json"),
            r#"{ "professor": "Dr. Berg", "lecture_titles": {} }"#,
        )
        .unwrap();

        let loader = MetadataLoader::new(dir.path());
        let metadata = loader.load("MBA 505 Leadership", "2024-03-06");
        assert_eq!(metadata.title, "MBA 505 Leadership Lecture");
        assert_eq!(metadata.professor, "Dr. Berg");
    }

    #[test]
    fn test_malformed_document_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("MBA 505 Leadership.json"), "not json").unwrap();

        let loader = MetadataLoader::new(dir.path());
        let metadata = loader.load("MBA 505 Leadership", "2024-03-06");
        assert_eq!(metadata.professor, "Professor");
    }

    #[test]
    fn test_derived_filename() {
        let metadata = LectureMetadata {
            title: "Capital Budgeting Basics".to_string(),
            class_name: "MBA 520 Business Finance".to_string(),
            professor: "Dr. Larsen".to_string(),
            date: "2024-03-05".to_string(),
        };
        assert_eq!(
            metadata.derived_filename(),
            "2024-03-05_Capital_Budgeting_Basics.mp3"
        );
    }
}
