use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize)]
pub struct TopicProgressQuery {
    pub user_id: String,
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProgressPayload {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub topic: String,
    #[validate(range(min = 1, max = 10))]
    pub level: u32,
    pub score: u32,
    #[serde(default)]
    pub answered_questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_max_level: Option<u32>,
    pub badge_awarded: bool,
}
