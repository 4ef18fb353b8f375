//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting a run
//! that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{PensumError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// A pipeline run needs the API key and the recordings directory.
    Run,
    /// Read-only commands need only the database.
    Inspect,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Run => {
            check_api_key()?;
            check_audio_dir(settings)?;
        }
        Operation::Inspect => {
            // The store creates its own file; nothing to verify up front.
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(PensumError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(PensumError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check that the recordings directory exists.
fn check_audio_dir(settings: &Settings) -> Result<()> {
    let audio_dir = settings.audio_dir();
    if audio_dir.exists() {
        Ok(())
    } else {
        Err(PensumError::Config(format!(
            "Recordings directory {} does not exist. Set recorder.audio_dir in the config.",
            audio_dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_has_no_requirements() {
        let settings = Settings::default();
        assert!(check(Operation::Inspect, &settings).is_ok());
    }

    #[test]
    fn test_run_requires_audio_dir() {
        if std::env::var("OPENAI_API_KEY").is_err() {
            return;
        }
        let mut settings = Settings::default();
        settings.recorder.audio_dir = "/nonexistent/recordings".to_string();
        assert!(matches!(
            check(Operation::Run, &settings),
            Err(PensumError::Config(_))
        ));
    }
}
