use crate::models::quiz::AcceptedQuestion;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuizPayload {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[serde(default)]
    pub topic: String,
    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
}

fn default_difficulty() -> u8 {
    1
}

/// What `generate_quiz` hands back to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuizResponse {
    Success {
        topic: String,
        level: u8,
        source_title: String,
        questions: Vec<AcceptedQuestion>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineTurn {
    pub role: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefineInterestPayload {
    #[validate(length(min = 1))]
    pub interest: String,
    #[serde(default)]
    pub history: Vec<RefineTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefineStatus {
    Broad,
    Specific,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefineInterestResponse {
    pub status: RefineStatus,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub refined_topic: Option<String>,
}
