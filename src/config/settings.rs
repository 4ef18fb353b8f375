//! Configuration settings for Pensum.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub recorder: RecorderSettings,
    pub drive: DriveSettings,
    pub transcription: TranscriptionSettings,
    pub insights: InsightSettings,
    pub database: DatabaseSettings,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (remote downloads, scratch audio).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.pensum".to_string(),
            temp_dir: "/tmp/pensum".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Where recordings and class metadata live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderSettings {
    /// Folder the recorder mounts to (or is copied into).
    pub audio_dir: String,
    /// Directory of per-class metadata JSON documents.
    pub metadata_dir: String,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            audio_dir: "~/recordings".to_string(),
            metadata_dir: "~/.pensum/lecture-metadata".to_string(),
        }
    }
}

/// Google Drive backup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct DriveSettings {
    /// Drive folder ID to back recordings up into. None disables the remote
    /// inventory and upload stage.
    pub folder_id: Option<String>,
    /// Path to a JSON file holding `{"access_token": "..."}`. The
    /// GOOGLE_DRIVE_TOKEN environment variable takes precedence.
    pub token_file: Option<String>,
}


/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Language hint passed to the engine. Lectures are English; forcing the
    /// hint avoids misdetection on noisy classroom audio.
    pub language: String,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Study-aid generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightSettings {
    /// Chat model used for all four generations.
    pub model: String,
    /// Character budget per prompt chunk.
    pub max_chunk_chars: usize,
    /// Retries per generation after the first attempt.
    pub max_retries: u32,
    /// Base delay for exponential backoff, in seconds.
    pub retry_delay_secs: u64,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_chunk_chars: 30_000,
            max_retries: 3,
            retry_delay_secs: 2,
        }
    }
}

/// Lecture database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database.
    pub sqlite_path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.pensum/lectures.db".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}


impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PensumError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pensum")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded recorder audio directory path.
    pub fn audio_dir(&self) -> PathBuf {
        Self::expand_path(&self.recorder.audio_dir)
    }

    /// Get the expanded class metadata directory path.
    pub fn metadata_dir(&self) -> PathBuf {
        Self::expand_path(&self.recorder.metadata_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.database.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.transcription.model, "whisper-1");
        assert_eq!(parsed.insights.max_chunk_chars, 30_000);
        assert_eq!(parsed.insights.max_retries, 3);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let settings: Settings =
            toml::from_str("[insights]\nmodel = \"gpt-4o\"\n").unwrap();
        assert_eq!(settings.insights.model, "gpt-4o");
        assert_eq!(settings.insights.max_retries, 3);
        assert_eq!(settings.transcription.language, "en");
    }
}
