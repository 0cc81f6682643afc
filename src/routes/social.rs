use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::dto::user_dto::ToggleFollowPayload;
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn toggle_follow(
    State(state): State<AppState>,
    Json(payload): Json<ToggleFollowPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let is_following = state
        .follow_service
        .toggle_follow(&payload.follower_id, &payload.following_id)
        .await?;
    Ok(Json(json!({ "status": "success", "is_following": is_following })))
}

#[axum::debug_handler]
pub async fn get_following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let users = state.follow_service.get_following(&user_id).await?;
    Ok(Json(json!({ "status": "success", "users": users })))
}

#[axum::debug_handler]
pub async fn explore_interests(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let interests = state.follow_service.explore_interests(&user_id).await?;
    Ok(Json(json!({ "status": "success", "interests": interests })))
}
