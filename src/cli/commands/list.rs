//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::LectureStore;
use anyhow::Result;

/// Run the list command. Read-only, so the pipeline is never constructed.
pub fn run_list(settings: Settings) -> Result<()> {
    let store = LectureStore::new(&settings.sqlite_path())?;
    let lectures = store.list_lectures()?;

    if lectures.is_empty() {
        Output::info("No lectures processed yet. Use 'pensum run' to process recordings.");
        return Ok(());
    }

    Output::header(&format!("Lectures ({})", lectures.len()));
    println!();
    for lecture in &lectures {
        Output::lecture_info(
            &lecture.title,
            &lecture.class_number,
            &lecture.date,
            &lecture.id.to_string(),
            lecture.duration_seconds,
        );
    }

    let total_seconds: i64 = lectures.iter().map(|l| l.duration_seconds).sum();
    println!();
    Output::kv("Total lectures", &lectures.len().to_string());
    Output::kv(
        "Total recorded",
        &crate::cli::output::format_duration(total_seconds),
    );

    Ok(())
}
