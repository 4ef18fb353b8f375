//! Run command - reconcile recordings and process everything new.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{ItemOutcome, Orchestrator, WorkItem, WorkSource};
use anyhow::Result;
use console::style;
use std::io::{self, Write};

/// Run the pipeline: plan against all three inventories, confirm, process.
pub async fn run_pipeline(yes: bool, skip_upload: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Run, &settings)?;

    let orchestrator = Orchestrator::new(&settings)?;

    let spinner = Output::spinner("Scanning recordings...");
    let plan = orchestrator.plan().await?;
    spinner.finish_and_clear();

    for (name, reason) in &plan.unrecognized {
        Output::warning(&format!("Skipping '{}': {}", name, reason));
    }
    if plan.already_persisted > 0 {
        Output::info(&format!(
            "{} recording(s) already processed",
            plan.already_persisted
        ));
    }

    if plan.items.is_empty() {
        Output::success("Nothing to process. All recordings are up to date.");
        return Ok(());
    }

    Output::header(&format!("Recordings to process ({})", plan.items.len()));
    println!();
    for item in &plan.items {
        let origin = match &item.source {
            WorkSource::Local(_) => "local",
            WorkSource::Remote { .. } => "remote only",
        };
        Output::list_item(&format!(
            "{} ({}, {})",
            style(item.identifier.as_str()).bold(),
            item.metadata.title,
            origin
        ));
    }
    println!();

    let selected = if yes {
        plan.items
    } else {
        confirm_items(plan.items)?
    };

    if selected.is_empty() {
        Output::info("Nothing selected.");
        return Ok(());
    }

    let report = orchestrator.run(selected, skip_upload).await?;

    println!();
    for (identifier, outcome) in &report.outcomes {
        match outcome {
            ItemOutcome::Completed {
                lecture_id,
                insights_failed,
            } => {
                if *insights_failed {
                    Output::warning(&format!(
                        "{} transcribed ({}), but insight generation failed",
                        identifier, lecture_id
                    ));
                } else {
                    Output::success(&format!("{} ({})", identifier, lecture_id));
                }
            }
            ItemOutcome::Failed(reason) => {
                Output::error(&format!("{}: {}", identifier, reason));
            }
        }
    }

    println!();
    if report.failed > 0 {
        Output::warning(&format!(
            "Finished: {} completed, {} failed. Failed recordings will be retried next run.",
            report.completed, report.failed
        ));
    } else {
        Output::success(&format!("Finished: {} completed.", report.completed));
    }

    Ok(())
}

/// Ask per recording which ones to process.
fn confirm_items(items: Vec<WorkItem>) -> io::Result<Vec<WorkItem>> {
    let mut selected = Vec::new();
    for item in items {
        print!(
            "{} Process {}? {} ",
            style("?").cyan(),
            style(item.identifier.as_str()).bold(),
            style("[y/N]").dim()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let answer = input.trim().to_lowercase();
        if answer == "y" || answer == "yes" {
            selected.push(item);
        }
    }
    Ok(selected)
}
