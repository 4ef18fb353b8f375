//! Insight generation orchestration: chunking, retries, parsing, fallbacks.

use super::TextGenerator;
use crate::config::{InsightSettings, Prompts};
use crate::error::{PensumError, Result};
use crate::metadata::LectureMetadata;
use crate::orchestrator::{StageStatus, StatusTracker};
use crate::store::{InsightsRecord, LectureStore};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const MIN_MAIN_IDEAS: usize = 5;
const MAX_MAIN_IDEAS: usize = 8;
const SUMMARY_WORD_LIMIT: usize = 600;
const SUMMARY_TRUNCATE_WORDS: usize = 550;
const MIN_KEY_TERMS: usize = 8;
const MAX_KEY_TERMS: usize = 15;
const MIN_QUESTIONS: usize = 8;
const MAX_QUESTIONS: usize = 12;

/// A generated field, tagged with whether the model actually produced it.
///
/// `Fallback` values are placeholders substituted after every retry failed;
/// they persist like normal values but carry the failure reason.
#[derive(Debug, Clone, PartialEq)]
pub enum Generated<T> {
    Parsed(T),
    Fallback { value: T, reason: String },
}

impl<T> Generated<T> {
    pub fn value(&self) -> &T {
        match self {
            Generated::Parsed(v) => v,
            Generated::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Generated::Parsed(v) => v,
            Generated::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Generated::Fallback { .. })
    }
}

/// The four study aids for one lecture, each independently tagged.
#[derive(Debug, Clone)]
pub struct LectureInsights {
    pub main_ideas: Generated<Vec<String>>,
    pub summary: Generated<String>,
    pub key_terms: Generated<Vec<String>>,
    pub review_questions: Generated<Vec<String>>,
}

impl LectureInsights {
    pub fn into_record(self) -> InsightsRecord {
        InsightsRecord {
            summary: self.summary.into_value(),
            key_terms: self.key_terms.into_value(),
            main_ideas: self.main_ideas.into_value(),
            review_questions: self.review_questions.into_value(),
        }
    }
}

/// The insight stage: prompt assembly, chunked generation, persistence.
pub struct InsightProcessor {
    generator: Arc<dyn TextGenerator>,
    store: Arc<LectureStore>,
    prompts: Prompts,
    max_chunk_chars: usize,
    max_retries: u32,
    retry_delay_secs: u64,
    status: StatusTracker,
}

impl InsightProcessor {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<LectureStore>,
        prompts: Prompts,
        settings: &InsightSettings,
    ) -> Self {
        Self {
            generator,
            store,
            prompts,
            max_chunk_chars: settings.max_chunk_chars,
            max_retries: settings.max_retries,
            retry_delay_secs: settings.retry_delay_secs,
            status: StatusTracker::new(),
        }
    }

    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    /// Generate all four study aids for a lecture and persist them.
    ///
    /// Sub-generations fail independently; a failed field becomes a
    /// placeholder and the lecture still completes. Only a storage failure
    /// surfaces as an error.
    pub async fn process(
        &self,
        lecture_id: &Uuid,
        metadata: &LectureMetadata,
        full_text: &str,
        key: &str,
    ) -> Result<LectureInsights> {
        self.status.set(key, StageStatus::Processing);
        self.status.progress(key, "Generating insights...");

        let chunks = chunk_text(full_text, self.max_chunk_chars);
        debug!("Insight content split into {} chunk(s)", chunks.len());

        let mut vars: HashMap<&str, String> = HashMap::new();
        vars.insert("class", metadata.class_name.clone());
        vars.insert("professor", metadata.professor.clone());
        vars.insert("title", metadata.title.clone());

        self.status.progress(key, "Extracting main ideas...");
        let main_ideas = self.generate_main_ideas(&chunks, &vars).await;

        self.status.progress(key, "Writing summary...");
        let summary = self.generate_summary(&chunks, &vars).await;

        self.status.progress(key, "Extracting key terms...");
        let key_terms = self
            .generate_key_terms(&chunks, &vars, &metadata.class_name)
            .await;

        self.status.progress(key, "Generating review questions...");
        let review_questions = self
            .generate_questions(&chunks, &vars, main_ideas.value())
            .await;

        let insights = LectureInsights {
            main_ideas,
            summary,
            key_terms,
            review_questions,
        };

        self.status.progress(key, "Saving insights...");
        if let Err(e) = self
            .store
            .insert_insights(lecture_id, &insights.clone().into_record())
        {
            self.status.set(key, StageStatus::Failed);
            return Err(PensumError::Persistence(format!(
                "Failed to save insights for lecture {}: {}",
                lecture_id, e
            )));
        }

        let fallbacks = [
            insights.main_ideas.is_fallback(),
            insights.summary.is_fallback(),
            insights.key_terms.is_fallback(),
            insights.review_questions.is_fallback(),
        ]
        .iter()
        .filter(|f| **f)
        .count();
        if fallbacks > 0 {
            warn!(
                "Generated insights for '{}' with {} placeholder field(s)",
                metadata.title, fallbacks
            );
        } else {
            info!("Generated insights for '{}'", metadata.title);
        }

        self.status.set(key, StageStatus::Completed);
        self.status.progress(key, "Insights completed successfully");
        Ok(insights)
    }

    async fn generate_main_ideas(
        &self,
        chunks: &[String],
        vars: &HashMap<&str, String>,
    ) -> Generated<Vec<String>> {
        let mut ideas: Vec<String> = Vec::new();
        let mut last_error = String::new();

        for chunk in chunks {
            let mut vars = vars.clone();
            vars.insert("content", chunk.clone());
            let prompt = Prompts::render(&self.prompts.insights.main_ideas, &vars);

            match self.request_with_retries(&prompt).await {
                Ok(response) => ideas.extend(parse_list_items(&response)),
                Err(e) => last_error = e.to_string(),
            }
        }

        if ideas.is_empty() {
            return Generated::Fallback {
                value: vec![format!(
                    "Main ideas could not be generated ({}). Check the API key and model configuration, then re-run.",
                    last_error
                )],
                reason: last_error,
            };
        }

        ideas.dedup();
        while ideas.len() < MIN_MAIN_IDEAS {
            ideas.push(format!(
                "Review section {} of the lecture for additional key concepts",
                ideas.len() + 1
            ));
        }
        ideas.truncate(MAX_MAIN_IDEAS);
        Generated::Parsed(ideas)
    }

    async fn generate_summary(
        &self,
        chunks: &[String],
        vars: &HashMap<&str, String>,
    ) -> Generated<String> {
        let mut parts: Vec<String> = Vec::new();
        let mut last_error = String::new();

        for chunk in chunks {
            let mut vars = vars.clone();
            vars.insert("content", chunk.clone());
            let prompt = Prompts::render(&self.prompts.insights.summary, &vars);

            match self.request_with_retries(&prompt).await {
                Ok(response) => parts.push(response.trim().to_string()),
                Err(e) => last_error = e.to_string(),
            }
        }

        if parts.is_empty() {
            return Generated::Fallback {
                value: format!(
                    "Summary could not be generated ({}). Check the API key and model configuration, then re-run.",
                    last_error
                ),
                reason: last_error,
            };
        }

        Generated::Parsed(truncate_summary(&parts.join("\n\n")))
    }

    async fn generate_key_terms(
        &self,
        chunks: &[String],
        vars: &HashMap<&str, String>,
        class_name: &str,
    ) -> Generated<Vec<String>> {
        let mut terms: Vec<String> = Vec::new();
        let mut last_error = String::new();

        for chunk in chunks {
            let mut vars = vars.clone();
            vars.insert("content", chunk.clone());
            let prompt = Prompts::render(&self.prompts.insights.keywords, &vars);

            match self.request_with_retries(&prompt).await {
                Ok(response) => {
                    for term in parse_comma_list(&response) {
                        if !terms.iter().any(|t: &String| t.eq_ignore_ascii_case(&term)) {
                            terms.push(term);
                        }
                    }
                }
                Err(e) => last_error = e.to_string(),
            }
        }

        // A list built entirely from defaults is fabricated, not extracted,
        // whether the model errored or just produced nothing parseable.
        if terms.is_empty() {
            let reason = if last_error.is_empty() {
                "no key terms parsed from model responses".to_string()
            } else {
                last_error
            };
            return Generated::Fallback {
                value: default_key_terms(class_name),
                reason,
            };
        }

        if terms.len() < MIN_KEY_TERMS {
            for default in default_key_terms(class_name) {
                if terms.len() >= MIN_KEY_TERMS {
                    break;
                }
                if !terms.iter().any(|t| t.eq_ignore_ascii_case(&default)) {
                    terms.push(default);
                }
            }
        }
        terms.truncate(MAX_KEY_TERMS);
        Generated::Parsed(terms)
    }

    async fn generate_questions(
        &self,
        chunks: &[String],
        vars: &HashMap<&str, String>,
        main_ideas: &[String],
    ) -> Generated<Vec<String>> {
        // Questions are seeded by the main ideas; one call against the first
        // chunk is enough context for the model.
        let sample = chunks.first().cloned().unwrap_or_default();
        let mut vars = vars.clone();
        vars.insert("content", sample);
        vars.insert(
            "ideas",
            main_ideas
                .iter()
                .enumerate()
                .map(|(i, idea)| format!("{}. {}", i + 1, idea))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        let prompt = Prompts::render(&self.prompts.insights.questions, &vars);

        let mut questions = match self.request_with_retries(&prompt).await {
            Ok(response) => parse_list_items(&response),
            Err(e) => {
                return Generated::Fallback {
                    value: vec![format!(
                        "Review questions could not be generated ({}). Check the API key and model configuration, then re-run.",
                        e
                    )],
                    reason: e.to_string(),
                };
            }
        };

        if questions.is_empty() {
            return Generated::Fallback {
                value: vec![
                    "Review questions could not be parsed from the model response. Re-run insight generation.".to_string(),
                ],
                reason: "unparseable response".to_string(),
            };
        }

        let templates = [
            "What are the most important concepts from this lecture?",
            "How do the ideas in this lecture connect to earlier course material?",
            "What practical applications follow from this lecture's frameworks?",
            "Which concepts from this lecture are most likely to appear on an exam?",
        ];
        let mut template_iter = templates.iter().cycle();
        while questions.len() < MIN_QUESTIONS {
            // cycle() over a non-empty array always yields
            if let Some(t) = template_iter.next() {
                questions.push(t.to_string());
            }
        }
        questions.truncate(MAX_QUESTIONS);
        Generated::Parsed(questions)
    }

    /// Call the generator with exponential backoff. An empty response counts
    /// as a failure and is retried.
    async fn request_with_retries(&self, prompt: &str) -> Result<String> {
        let mut last_error = PensumError::Insight("No attempts made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay_secs * (1 << (attempt - 1));
                debug!("Retrying generation in {}s (attempt {})", delay, attempt + 1);
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }

            match self.generator.generate(prompt).await {
                Ok(response) if !response.trim().is_empty() => return Ok(response),
                Ok(_) => {
                    last_error = PensumError::Insight("Empty response from model".to_string());
                }
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }
}

/// Split text into chunks of at most `max_chars`, breaking on sentence
/// boundaries. A single sentence longer than the budget becomes its own
/// chunk rather than being split mid-sentence.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    // Split after sentence-ending punctuation followed by whitespace,
    // keeping the punctuation with the sentence.
    let boundary = Regex::new(r"[.!?]+\s+").expect("valid regex");
    let mut sentences: Vec<String> = Vec::new();
    let mut last = 0;
    for m in boundary.find_iter(text) {
        let end = m.start() + m.as_str().trim_end().len();
        sentences.push(text[last..end].to_string());
        last = m.end();
    }
    if last < text.len() {
        sentences.push(text[last..].to_string());
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for sentence in sentences {
        if !current.is_empty() && current.len() + 1 + sentence.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sentence);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Parse a numbered or bulleted list response into plain items.
fn parse_list_items(response: &str) -> Vec<String> {
    let numbering = Regex::new(r"^\d+[.)]\s*").expect("valid regex");
    let bullet = Regex::new(r"^[-•*]\s*").expect("valid regex");

    response
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = numbering.replace(line, "");
            let line = bullet.replace(&line, "");
            line.trim().to_string()
        })
        .filter(|line| line.len() > 3 && !line.ends_with(':'))
        .collect()
}

/// Parse a comma-separated keyword response. The model sometimes wraps the
/// list in commentary, so take the line with the most commas.
fn parse_comma_list(response: &str) -> Vec<String> {
    let best_line = response
        .lines()
        .max_by_key(|line| line.matches(',').count())
        .unwrap_or("");

    best_line
        .split(',')
        .map(|term| term.trim().trim_matches(|c| c == '.' || c == '"').to_string())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Hard ceiling on summary length. Over the limit, cut at a word boundary
/// and mark the truncation.
fn truncate_summary(summary: &str) -> String {
    let words: Vec<&str> = summary.split_whitespace().collect();
    if words.len() <= SUMMARY_WORD_LIMIT {
        return summary.trim().to_string();
    }
    let mut truncated = words[..SUMMARY_TRUNCATE_WORDS].join(" ");
    truncated.push_str("...");
    truncated
}

/// Subject-matter defaults used when the model returns too few key terms.
fn default_key_terms(class_name: &str) -> Vec<String> {
    let lower = class_name.to_lowercase();
    let terms: &[&str] = if lower.contains("finance") {
        &[
            "Net Present Value",
            "Capital Budgeting",
            "Cost of Capital",
            "Cash Flow",
            "Discount Rate",
            "Risk and Return",
            "Valuation",
            "Time Value of Money",
        ]
    } else if lower.contains("operations") {
        &[
            "Process Flow",
            "Bottleneck",
            "Capacity",
            "Lead Time",
            "Inventory Management",
            "Quality Control",
            "Supply Chain",
            "Throughput",
        ]
    } else if lower.contains("marketing") {
        &[
            "Segmentation",
            "Targeting",
            "Positioning",
            "Brand Equity",
            "Customer Value",
            "Marketing Mix",
            "Market Research",
            "Consumer Behavior",
        ]
    } else if lower.contains("accounting") {
        &[
            "Balance Sheet",
            "Income Statement",
            "Cash Flow Statement",
            "Accruals",
            "Revenue Recognition",
            "Depreciation",
            "Financial Ratios",
            "Cost Allocation",
        ]
    } else {
        &[
            "Strategic Framework",
            "Core Concepts",
            "Business Analysis",
            "Decision Making",
            "Case Study",
            "Management Principles",
            "Competitive Advantage",
            "Organizational Behavior",
        ]
    };
    terms.iter().map(|t| t.to_string()).collect()
}
