//! Error types for Pensum.

use thiserror::Error;

/// Library-level error type for Pensum operations.
#[derive(Error, Debug)]
pub enum PensumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed filename: {0}")]
    MalformedFilename(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Drive error: {0}")]
    Drive(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Insight generation failed: {0}")]
    Insight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Pensum operations.
pub type Result<T> = std::result::Result<T, PensumError>;
