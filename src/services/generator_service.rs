use crate::config::{GenerationMode, QuizSettings};
use crate::models::quiz::{OptionCandidate, QuestionCandidate, SourceDocument};
use crate::services::llm_client::TextGenerator;
use crate::utils::json_extract::parse_model_json;
use crate::utils::text::{clean_explanation, truncate_chars};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[derive(Deserialize)]
struct RawCandidate {
    question: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Flagged {
        text: String,
        #[serde(default)]
        is_correct: bool,
    },
    Plain(String),
}

impl From<RawOption> for OptionCandidate {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Flagged { text, is_correct } => OptionCandidate { text, is_correct },
            RawOption::Plain(text) => OptionCandidate {
                text,
                is_correct: false,
            },
        }
    }
}

/// Produces candidate questions grounded in one source document.
#[derive(Clone)]
pub struct CandidateGenerator {
    llm: Arc<dyn TextGenerator>,
    settings: QuizSettings,
}

impl CandidateGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>, settings: QuizSettings) -> Self {
        Self { llm, settings }
    }

    /// Returns only structurally valid candidates; an empty vector means every
    /// request failed or produced nothing usable.
    pub async fn generate(
        &self,
        source: &SourceDocument,
        topic: &str,
        difficulty: u8,
        exclusions: &[String],
        count: usize,
    ) -> Vec<QuestionCandidate> {
        if count == 0 || source.content.trim().is_empty() {
            return Vec::new();
        }
        tracing::info!(topic, article = %source.title, count, "Generating quiz candidates");

        let raw_items = match self.settings.generation_mode {
            GenerationMode::Parallel => self.fan_out(source, topic, difficulty, exclusions, count).await,
            GenerationMode::Batched => self.single_batch(source, topic, difficulty, exclusions, count).await,
        };

        let candidates: Vec<QuestionCandidate> = raw_items
            .into_iter()
            .filter_map(|item| into_candidate(item, source))
            .take(count)
            .collect();

        tracing::info!(topic, produced = candidates.len(), requested = count, "Candidate generation finished");
        candidates
    }

    async fn fan_out(
        &self,
        source: &SourceDocument,
        topic: &str,
        difficulty: u8,
        exclusions: &[String],
        count: usize,
    ) -> Vec<JsonValue> {
        let prompt = build_generation_prompt(
            topic,
            difficulty,
            source,
            exclusions,
            &self.settings.language,
            self.settings.source_char_limit,
            None,
        );

        let requests = (0..count).map(|request_id| {
            let prompt = &prompt;
            async move {
                let temperature = (0.3 + 0.1 * request_id as f32).min(1.0);
                (request_id, self.request_items(prompt, temperature).await)
            }
        });

        let mut items = Vec::with_capacity(count);
        for (request_id, result) in join_all(requests).await {
            match result {
                Some(mut batch) => items.append(&mut batch),
                None => tracing::warn!(request_id, "Generation request produced no candidate"),
            }
        }
        items
    }

    async fn single_batch(
        &self,
        source: &SourceDocument,
        topic: &str,
        difficulty: u8,
        exclusions: &[String],
        count: usize,
    ) -> Vec<JsonValue> {
        let prompt = build_generation_prompt(
            topic,
            difficulty,
            source,
            exclusions,
            &self.settings.language,
            self.settings.source_char_limit,
            Some(count),
        );
        self.request_items(&prompt, 0.7).await.unwrap_or_default()
    }

    async fn request_items(&self, prompt: &str, temperature: f32) -> Option<Vec<JsonValue>> {
        let call = self.llm.generate(prompt, temperature, true);
        let text = match tokio::time::timeout(self.settings.request_timeout, call).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Generation call failed");
                return None;
            }
            Err(_) => {
                tracing::warn!("Generation call timed out");
                return None;
            }
        };

        match parse_model_json::<JsonValue>(&text) {
            Ok(value) => Some(candidate_items(value)),
            Err(e) => {
                tracing::warn!(error = %e, "Generation output was not JSON");
                None
            }
        }
    }
}

/// Accepts a lone object, a bare array, or `{"questions": [...]}`.
fn candidate_items(value: JsonValue) -> Vec<JsonValue> {
    match value {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut obj) => match obj.remove("questions") {
            Some(JsonValue::Array(items)) => items,
            Some(other) => {
                obj.insert("questions".to_string(), other);
                vec![JsonValue::Object(obj)]
            }
            None => vec![JsonValue::Object(obj)],
        },
        _ => Vec::new(),
    }
}

fn into_candidate(item: JsonValue, source: &SourceDocument) -> Option<QuestionCandidate> {
    let raw: RawCandidate = serde_json::from_value(item).ok()?;
    let mut candidate = QuestionCandidate {
        question: raw.question?,
        options: raw.options.into_iter().map(OptionCandidate::from).collect(),
        explanation: raw.explanation.unwrap_or_default(),
        citation: source.url.clone(),
    };
    if !candidate.normalize() {
        tracing::warn!(question = %candidate.question, "Dropping structurally invalid candidate");
        return None;
    }
    candidate.explanation = clean_explanation(&candidate.explanation, &source.url);
    Some(candidate)
}

pub fn difficulty_guidance(difficulty: u8) -> &'static str {
    match difficulty {
        0..=3 => "Basic facts, famous works, intro-level knowledge (e.g. who is the main figure, when did it start).",
        4..=6 => "Intermediate details, specific terminology, notable events and the people involved.",
        _ => "Expert trivia: obscure details, behind-the-scenes or production history, specific dates and numbers.",
    }
}

/// Prompt for `batch = None` (one question) or `Some(n)` (an array of n).
pub fn build_generation_prompt(
    topic: &str,
    difficulty: u8,
    source: &SourceDocument,
    exclusions: &[String],
    language: &str,
    char_limit: usize,
    batch: Option<usize>,
) -> String {
    let content = truncate_chars(&source.content, char_limit);

    let task = match batch {
        None => format!(
            "Create ONE multiple-choice quiz question about \"{}\" based ONLY on the provided text.",
            topic
        ),
        Some(n) => format!(
            "Create {} different multiple-choice quiz questions about \"{}\" based ONLY on the provided text. Each question must test a different fact.",
            n, topic
        ),
    };

    let example = r#"{
  "question": "Which planet is the largest in the Solar System?",
  "options": [
    { "text": "Jupiter", "is_correct": true },
    { "text": "Saturn", "is_correct": false },
    { "text": "Neptune", "is_correct": false },
    { "text": "Earth", "is_correct": false }
  ],
  "explanation": "Jupiter is the largest planet, more than twice as massive as all the others combined."
}"#;
    let output_format = match batch {
        None => format!("OUTPUT FORMAT (a single JSON object):\n{}", example),
        Some(_) => format!("OUTPUT FORMAT (a JSON array of objects shaped like this):\n[{}]", example),
    };

    let exclusion_block = if exclusions.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = exclusions.iter().map(|q| format!("- {}", q)).collect();
        format!("\nEXCLUDED QUESTIONS (Do NOT repeat these):\n{}\n", lines.join("\n"))
    };

    format!(
        r#"You are a professional quiz creator.
Target Audience: {language} speakers.
Topic: "{topic}"
Difficulty: {difficulty}/10
DIFFICULTY GUIDELINES: {guidance}

{task}

SOURCE TEXT (from "{title}"):
"""
{content}
"""

NEGATIVE CONSTRAINTS (STRICTLY FORBIDDEN):
- DO NOT ask about "the text", "this article", "the author", or "Wikipedia".
- DO NOT ask meta-questions like "What is the title of this passage?".
- DO NOT use phrases like "According to the text" or "In this passage". The question must stand alone as a general knowledge question.
- DO NOT write a question whose answer is simply "{topic}".
- DO NOT output markdown formatting. Output RAW JSON only.

REQUIREMENTS:
1. Write the question, options and explanation in {language}.
2. Test knowledge about "{topic}" (history, facts, people, definitions).
3. Give exactly 4 distinct options: 1 correct, 3 plausible distractors.
4. The explanation must cite the specific fact from the text.

{output_format}
{exclusion_block}"#,
        language = language,
        topic = topic,
        difficulty = difficulty,
        guidance = difficulty_guidance(difficulty),
        task = task,
        title = source.title,
        content = content,
        output_format = output_format,
        exclusion_block = exclusion_block,
    )
}
