use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub nickname: String,
    pub password: String,
    /// Stored as a JSON array.
    pub interests: Json<Vec<String>>,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
}

/// What other users get to see of someone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct UserSummary {
    pub user_id: String,
    pub nickname: String,
    pub avatar_url: String,
    pub is_following: bool,
}
