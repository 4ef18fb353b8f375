//! Insight generation stage.
//!
//! Four derived study aids per lecture: main ideas, summary, key terms, and
//! review questions. Each sub-generation fails independently; a failed field
//! is replaced by an explanatory placeholder so the lecture still completes.

mod generator;
mod processor;

pub use generator::{OpenAiGenerator, TextGenerator};
pub use processor::{Generated, InsightProcessor, LectureInsights};
