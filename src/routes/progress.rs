use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::dto::progress_dto::{TopicProgressQuery, UpdateProgressPayload};
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_topic_progress(
    State(state): State<AppState>,
    Query(query): Query<TopicProgressQuery>,
) -> Result<impl IntoResponse> {
    let max_level = state
        .progress_service
        .get_topic_progress(&query.user_id, &query.topic)
        .await?;
    Ok(Json(json!({ "status": "success", "max_level": max_level })))
}

#[axum::debug_handler]
pub async fn update_progress(
    State(state): State<AppState>,
    Json(payload): Json<UpdateProgressPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let update = state.progress_service.update_progress(payload).await?;
    let mut body = serde_json::to_value(update)?;
    body["status"] = json!("success");
    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn get_user_badges(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let badges = state.progress_service.get_user_badges(&user_id).await?;
    Ok(Json(json!({ "status": "success", "badges": badges })))
}
