use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterPayload {
    #[validate(length(min = 1, max = 64))]
    pub nickname: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[serde(default)]
    pub interests: Vec<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(length(min = 1))]
    pub nickname: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfilePayload {
    #[validate(length(min = 1, max = 64))]
    pub nickname: Option<String>,
    pub interests: Option<Vec<String>>,
    pub avatar_url: Option<String>,
}

/// Profile as returned by register/login/get.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileResponse {
    pub user_id: String,
    pub nickname: String,
    pub interests: Vec<String>,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchUsersQuery {
    pub user_id: String,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ToggleFollowPayload {
    #[validate(length(min = 1))]
    pub follower_id: String,
    #[validate(length(min = 1))]
    pub following_id: String,
}
