//! Pensum - Lecture Transcription Pipeline
//!
//! A CLI pipeline for turning raw classroom recordings into transcripts and
//! study aids.
//!
//! The name "Pensum" comes from the Norwegian word for "syllabus."
//!
//! # Overview
//!
//! Pensum allows you to:
//! - Identify which class a recording belongs to from its timestamp filename
//! - Find recordings that have not been processed yet
//! - Back recordings up to Google Drive before anything else touches them
//! - Transcribe lectures with timestamped segments
//! - Generate summaries, key terms, main ideas, and review questions
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `schedule` - Filename parsing and class schedule lookup
//! - `reconcile` - Comparing local, remote, and persisted inventories
//! - `metadata` - Per-class lecture metadata lookup
//! - `drive` - Object storage abstraction (Google Drive)
//! - `transcription` - Speech-to-text and transcript persistence
//! - `insights` - Study-aid generation from transcripts
//! - `store` - Lecture database
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use pensum::config::Settings;
//! use pensum::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let plan = orchestrator.plan().await?;
//!     let report = orchestrator.run(plan.items, false).await?;
//!     println!("Processed {} lectures", report.completed);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod drive;
pub mod error;
pub mod insights;
pub mod metadata;
pub mod openai;
pub mod orchestrator;
pub mod reconcile;
pub mod schedule;
pub mod store;
pub mod transcription;

pub use error::{PensumError, Result};
