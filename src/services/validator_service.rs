use crate::config::QuizSettings;
use crate::models::quiz::{QuestionCandidate, SourceDocument, ValidationVerdict};
use crate::services::llm_client::TextGenerator;
use crate::utils::json_extract::parse_model_json;
use crate::utils::text::truncate_chars;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    SelfCheck,
    Judge,
    Solver,
}

impl CheckKind {
    const ALL: [CheckKind; 3] = [CheckKind::SelfCheck, CheckKind::Judge, CheckKind::Solver];
}

/// Correlates a verification response with the candidate and check it was
/// issued for, independent of completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckId {
    pub candidate: usize,
    pub kind: CheckKind,
}

struct CheckRequest {
    id: CheckId,
    prompt: String,
}

#[derive(Deserialize)]
struct SelfCheckReply {
    #[serde(default)]
    confident: bool,
}

#[derive(Deserialize)]
struct JudgeReply {
    #[serde(default)]
    pass: bool,
}

#[derive(Deserialize)]
struct SolverReply {
    #[serde(default)]
    predicted_answer: String,
}

/// Three-way correctness check over generated candidates.
#[derive(Clone)]
pub struct CandidateValidator {
    llm: Arc<dyn TextGenerator>,
    settings: QuizSettings,
}

impl CandidateValidator {
    pub fn new(llm: Arc<dyn TextGenerator>, settings: QuizSettings) -> Self {
        Self { llm, settings }
    }

    /// Accepted subset of `candidates`, order preserved.
    ///
    /// When not a single verification call gets through, the batch is passed
    /// through unfiltered.
    pub async fn validate(
        &self,
        candidates: Vec<QuestionCandidate>,
        source: &SourceDocument,
    ) -> Vec<QuestionCandidate> {
        if candidates.is_empty() {
            return candidates;
        }

        let Some(verdicts) = self.collect_verdicts(&candidates, source).await else {
            tracing::error!(
                candidates = candidates.len(),
                "Every validation call failed, passing candidates through unfiltered"
            );
            return candidates;
        };

        candidates
            .into_iter()
            .zip(verdicts)
            .enumerate()
            .filter_map(|(idx, (candidate, verdict))| {
                let correct = candidate.correct_text().unwrap_or_default();
                let accepted = verdict.accepts(correct);
                tracing::debug!(
                    candidate = idx,
                    self_check = verdict.confident,
                    judge = verdict.pass,
                    solver = verdict.solver_agrees(correct),
                    predicted = %verdict.predicted_answer,
                    accepted,
                    "Validation verdict"
                );
                if accepted {
                    Some(candidate)
                } else {
                    tracing::warn!(candidate = idx, question = %candidate.question, "Candidate rejected");
                    None
                }
            })
            .collect()
    }

    /// One verdict per candidate, or `None` if the whole batch failed.
    pub async fn collect_verdicts(
        &self,
        candidates: &[QuestionCandidate],
        source: &SourceDocument,
    ) -> Option<Vec<ValidationVerdict>> {
        let content = truncate_chars(&source.content, self.settings.source_char_limit);
        let requests = build_check_requests(candidates, content);
        tracing::info!(checks = requests.len(), "Running validation checks");

        let mut in_flight: FuturesUnordered<_> = requests
            .into_iter()
            .map(|req| async move {
                let call = self.llm.generate(&req.prompt, 0.0, true);
                let outcome = match tokio::time::timeout(self.settings.request_timeout, call).await {
                    Ok(Ok(text)) => Some(text),
                    Ok(Err(e)) => {
                        tracing::warn!(candidate = req.id.candidate, check = ?req.id.kind, error = %e, "Validation call failed");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(candidate = req.id.candidate, check = ?req.id.kind, "Validation call timed out");
                        None
                    }
                };
                (req.id, outcome)
            })
            .collect();

        let mut responses: HashMap<CheckId, String> = HashMap::new();
        while let Some((id, outcome)) = in_flight.next().await {
            if let Some(text) = outcome {
                responses.insert(id, text);
            }
        }

        if responses.is_empty() {
            return None;
        }

        let verdicts = (0..candidates.len())
            .map(|candidate| {
                let reply = |kind| responses.get(&CheckId { candidate, kind }).map(String::as_str);
                ValidationVerdict {
                    confident: reply(CheckKind::SelfCheck)
                        .and_then(|t| parse_model_json::<SelfCheckReply>(t).ok())
                        .map(|r| r.confident)
                        .unwrap_or(false),
                    pass: reply(CheckKind::Judge)
                        .and_then(|t| parse_model_json::<JudgeReply>(t).ok())
                        .map(|r| r.pass)
                        .unwrap_or(false),
                    predicted_answer: reply(CheckKind::Solver)
                        .and_then(|t| parse_model_json::<SolverReply>(t).ok())
                        .map(|r| r.predicted_answer)
                        .unwrap_or_default(),
                }
            })
            .collect();
        Some(verdicts)
    }
}

fn build_check_requests(candidates: &[QuestionCandidate], content: &str) -> Vec<CheckRequest> {
    let mut rng = rand::thread_rng();
    let mut requests = Vec::with_capacity(candidates.len() * CheckKind::ALL.len());

    for (candidate_idx, q) in candidates.iter().enumerate() {
        for kind in CheckKind::ALL {
            let prompt = match kind {
                CheckKind::SelfCheck => self_check_prompt(q, content),
                CheckKind::Judge => judge_prompt(q, content),
                CheckKind::Solver => {
                    let mut options: Vec<&str> = q.options.iter().map(|o| o.text.as_str()).collect();
                    options.shuffle(&mut rng);
                    solver_prompt(q, &options, content)
                }
            };
            requests.push(CheckRequest {
                id: CheckId {
                    candidate: candidate_idx,
                    kind,
                },
                prompt,
            });
        }
    }
    requests
}

pub fn self_check_prompt(q: &QuestionCandidate, content: &str) -> String {
    format!(
        r#"Verify this question against the following text ONLY.
Question: {question}
Proposed Answer: {answer}

SOURCE TEXT:
"""
{content}
"""

Is the proposed answer strictly supported by the text?
Return JSON: {{ "confident": boolean, "reason": "string" }}"#,
        question = q.question,
        answer = q.correct_text().unwrap_or("Unknown"),
        content = content,
    )
}

pub fn judge_prompt(q: &QuestionCandidate, content: &str) -> String {
    let distractors: Vec<&str> = q.distractors().collect();
    format!(
        r#"You are a strict quiz editor. Review this question.
SOURCE TEXT:
"""
{content}
"""

Question: {question}
Correct Answer: {answer}
Distractors: {distractors}
Explanation: {explanation}

Verify facts based ONLY on the Source Text provided above.
Check for:
1. Factuality (Is it true according to the text?)
2. Clarity (Is it unambiguous?)
3. Distractor Quality (Are they clearly wrong based on the text?)
4. Trivia Quality (Reject questions that just ask "What is the article title?" or "What is this text about?". Ensure it tests specific knowledge.)

Return JSON: {{ "pass": boolean, "reason": "string" }}"#,
        content = content,
        question = q.question,
        answer = q.correct_text().unwrap_or("Unknown"),
        distractors = distractors.join(", "),
        explanation = q.explanation,
    )
}

pub fn solver_prompt(q: &QuestionCandidate, options: &[&str], content: &str) -> String {
    format!(
        r#"Solve this quiz question based ONLY on the following text.
SOURCE TEXT:
"""
{content}
"""

Question: {question}
Options: {options}

Return JSON: {{ "predicted_answer": "string (exact text from options)" }}"#,
        content = content,
        question = q.question,
        options = options.join(", "),
    )
}
