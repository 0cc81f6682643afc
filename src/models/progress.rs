use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MAX_LEVEL: u32 = 10;
pub const PERFECT_SCORE: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TopicProgress {
    pub user_id: String,
    pub topic: String,
    pub max_level: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Badge {
    pub user_id: String,
    pub topic: String,
    pub awarded_at: DateTime<Utc>,
}

/// A question text the user has already answered for a topic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryEntry {
    pub user_id: String,
    pub topic: String,
    pub question_text: String,
    pub created_at: DateTime<Utc>,
}
