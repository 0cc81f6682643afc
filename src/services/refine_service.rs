use crate::dto::quiz_dto::{RefineInterestResponse, RefineStatus, RefineTurn};
use crate::error::{Error, Result};
use crate::services::llm_client::TextGenerator;
use crate::utils::json_extract::{parse_model_json, ParseError};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const REFINE_TEMPERATURE: f32 = 0.3;

#[derive(Deserialize)]
struct RefineReply {
    #[serde(default)]
    status: Option<RefineStatus>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    refined_topic: Option<String>,
}

/// Narrows a broad interest into a quiz topic over a short dialogue.
#[derive(Clone)]
pub struct RefineService {
    llm: Arc<dyn TextGenerator>,
    language: String,
    timeout: Duration,
}

impl RefineService {
    pub fn new(llm: Arc<dyn TextGenerator>, language: String, timeout: Duration) -> Self {
        Self {
            llm,
            language,
            timeout,
        }
    }

    pub async fn refine_interest(
        &self,
        interest: &str,
        history: &[RefineTurn],
    ) -> Result<RefineInterestResponse> {
        let interest = interest.trim();
        if interest.is_empty() {
            return Err(Error::BadRequest("interest must not be empty".to_string()));
        }

        let prompt = match history.last() {
            None => clarify_prompt(interest, &self.language),
            Some(last) => combine_prompt(interest, &last.text),
        };

        let text = tokio::time::timeout(
            self.timeout,
            self.llm.generate(&prompt, REFINE_TEMPERATURE, true),
        )
        .await
        .map_err(|_| Error::Upstream("interest refinement timed out".to_string()))??;

        let reply: RefineReply = match parse_model_json(&text) {
            Ok(reply) => reply,
            Err(ParseError::Empty) => return Ok(specific(interest)),
            Err(e) => {
                tracing::warn!(interest, error = %e, "Unreadable refinement reply");
                return Err(Error::Upstream(format!("unreadable refinement reply: {}", e)));
            }
        };

        let response = match (history.is_empty(), reply) {
            (
                true,
                RefineReply {
                    question: Some(question),
                    status: None | Some(RefineStatus::Broad),
                    ..
                },
            ) if !question.trim().is_empty() => RefineInterestResponse {
                status: RefineStatus::Broad,
                question: Some(question.trim().to_string()),
                refined_topic: None,
            },
            (_, RefineReply { refined_topic: Some(topic), .. }) if !topic.trim().is_empty() => {
                RefineInterestResponse {
                    status: RefineStatus::Specific,
                    question: None,
                    refined_topic: Some(topic.trim().to_string()),
                }
            }
            _ => specific(interest),
        };
        tracing::info!(interest, status = ?response.status, "Interest refined");
        Ok(response)
    }
}

fn specific(interest: &str) -> RefineInterestResponse {
    RefineInterestResponse {
        status: RefineStatus::Specific,
        question: None,
        refined_topic: Some(interest.to_string()),
    }
}

pub fn clarify_prompt(interest: &str, language: &str) -> String {
    format!(
        r#"You help users of a quiz app find a specific passion. The user entered the interest "{interest}".
Ask exactly ONE friendly clarification question in {language} that helps them narrow it down, and include two or three concrete examples in parentheses.
Return JSON only: {{ "status": "broad", "question": "<your question>", "refined_topic": null }}"#,
        interest = interest,
        language = language,
    )
}

pub fn combine_prompt(interest: &str, last_reply: &str) -> String {
    format!(
        r#"You help users of a quiz app find a specific passion. Their interest is "{interest}" and their last reply was "{reply}".
Combine the interest and the reply into one final, specific quiz topic that an encyclopedia article would cover.
Return JSON only: {{ "status": "specific", "question": null, "refined_topic": "<final topic>" }}"#,
        interest = interest,
        reply = last_reply,
    )
}
