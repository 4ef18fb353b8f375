//! CLI module for Pensum.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Pensum - Lecture Transcription Pipeline
///
/// A CLI tool that turns timestamped classroom recordings into transcribed,
/// searchable lectures with generated study aids. The name "Pensum" is the
/// Norwegian word for a course's required syllabus.
#[derive(Parser, Debug)]
#[command(name = "pensum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Pensum and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Find unprocessed recordings and run them through the pipeline
    Run {
        /// Process everything without per-recording confirmation
        #[arg(short, long)]
        yes: bool,

        /// Do not archive local recordings to remote storage
        #[arg(long)]
        skip_upload: bool,
    },

    /// List processed lectures
    List,

    /// Show one lecture with its insights
    Show {
        /// Lecture id (from 'pensum list')
        id: String,
    },
}
