//! Prompt templates for Pensum.
//!
//! Prompts can be customized by placing an `insights.toml` in the custom
//! prompts directory. Templates use `{{variable}}` placeholders.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub insights: InsightPrompts,
}


/// Prompts for the four study-aid generations.
///
/// Variables available: `{{class}}`, `{{professor}}`, `{{title}}`,
/// `{{content}}`, and (questions only) `{{ideas}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightPrompts {
    pub main_ideas: String,
    pub summary: String,
    pub keywords: String,
    pub questions: String,
}

impl Default for InsightPrompts {
    fn default() -> Self {
        Self {
            main_ideas: r#"You are analyzing a {{class}} lecture by {{professor}} titled "{{title}}".

Identify the 6-8 most important main ideas or key concepts discussed in this lecture. Focus on:
- Core business concepts and frameworks
- Key theories or models presented
- Strategic insights or principles
- Critical takeaways for MBA students

Lecture content:
{{content}}

Provide exactly 6-8 main ideas as a numbered list. Each idea should be concise (8-12 words). No additional explanation or commentary; provide only the list.

Format your response as:
1. [Main idea 1]
2. [Main idea 2]
...etc."#
                .to_string(),

            summary: r#"Create a comprehensive summary of this {{class}} lecture by {{professor}} on "{{title}}".

Your summary should be 150-250 words and include:
1. Brief introduction to the topic
2. Main arguments and key points presented
3. Important frameworks, models, or methodologies discussed
4. Practical applications or case studies mentioned
5. Key conclusions and takeaways for MBA students

Focus on content valuable for exam preparation. No supplementary words, introductions, or conclusions outside of the summary itself.

Lecture content:
{{content}}

Write a well-structured, professional summary suitable for MBA students preparing for exams."#
                .to_string(),

            keywords: r#"Extract 12-15 important keywords and key terms from this {{class}} lecture.

Focus on:
- Business terminology and jargon
- Frameworks and models (e.g., SWOT, Porter's Five Forces)
- Technical terms specific to the subject area
- Concepts likely to appear in exams

Avoid common words. Focus on substantive business and academic terms.

Lecture content:
{{content}}

Provide exactly 12-15 keywords as a simple comma-separated list (no numbers or bullets). No introductory text like "Keywords include". Only provide the list.
Example format: Strategic Planning, Market Analysis, Competitive Advantage, SWOT Analysis, ..."#
                .to_string(),

            questions: r#"Generate 10-12 review questions for this {{class}} lecture on "{{title}}".

Main concepts covered:
{{ideas}}

Create a mix of question types:
- factual/recall questions (What is...? Define...?)
- analytical questions (How does...? Why is...? Compare...?)
- application questions (How would you apply...? What would happen if...?)

Questions should be suitable for MBA-level study, cover the most important concepts, and be specific enough to guide study.

Lecture sample:
{{content}}

Provide exactly 10-12 questions as a numbered list. No additional explanation or commentary. Example format:
1. [Question 1]
2. [Question 2]
...etc."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default templates, with optional custom
    /// directory overrides.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let insights_path = custom_path.join("insights.toml");
            if insights_path.exists() {
                let content = std::fs::read_to_string(&insights_path)?;
                prompts.insights = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a template, substituting `{{key}}` placeholders.
    pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
        let mut rendered = template.to_string();
        for (key, value) in vars {
            rendered = rendered.replace(&format!("{{{{{}}}}}", key), value);
        }
        rendered
    }
}
