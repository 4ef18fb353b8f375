//! Show command - one lecture with its transcript stats and insights.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::LectureStore;
use anyhow::Result;
use console::style;
use uuid::Uuid;

/// Run the show command.
pub fn run_show(id: &str, settings: Settings) -> Result<()> {
    let lecture_id = Uuid::parse_str(id)
        .map_err(|_| anyhow::anyhow!("'{}' is not a lecture id (see 'pensum list')", id))?;

    let store = LectureStore::new(&settings.sqlite_path())?;
    let Some(complete) = store.fetch_lecture(&lecture_id)? else {
        Output::error(&format!("No lecture with id {}", lecture_id));
        return Ok(());
    };

    Output::header(&complete.lecture.title);
    println!();
    Output::kv("Class", &complete.lecture.class_number);
    Output::kv("Professor", &complete.lecture.professor);
    Output::kv("Date", &complete.lecture.date);
    Output::kv(
        "Duration",
        &crate::cli::output::format_duration(complete.lecture.duration_seconds),
    );
    Output::kv("Segments", &complete.segments.len().to_string());

    let Some(insights) = complete.insights else {
        println!();
        Output::info("No insights generated for this lecture yet.");
        return Ok(());
    };

    println!("\n{}", style("Main Ideas").bold());
    for idea in &insights.main_ideas {
        Output::list_item(idea);
    }

    println!("\n{}", style("Summary").bold());
    println!("  {}", insights.summary);

    println!("\n{}", style("Key Terms").bold());
    println!("  {}", insights.key_terms.join(", "));

    println!("\n{}", style("Review Questions").bold());
    for (i, question) in insights.review_questions.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }

    Ok(())
}
