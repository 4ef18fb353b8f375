//! Configuration module for Pensum.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{InsightPrompts, Prompts};
pub use settings::{
    DatabaseSettings, DriveSettings, GeneralSettings, InsightSettings, PromptSettings,
    RecorderSettings, Settings, TranscriptionSettings,
};
