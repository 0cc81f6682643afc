use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::dto::user_dto::{LoginPayload, RegisterPayload, SearchUsersQuery, UpdateProfilePayload};
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "success", "user": user }))))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .user_service
        .login(&payload.nickname, &payload.password)
        .await?;
    Ok(Json(json!({ "status": "success", "user": user })))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_user(&user_id).await?;
    Ok(Json(json!({ "status": "success", "user": user })))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.update_profile(&user_id, payload).await?;
    Ok(Json(json!({ "status": "success", "user": user })))
}

#[axum::debug_handler]
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchUsersQuery>,
) -> Result<impl IntoResponse> {
    let users = state
        .user_service
        .search_users(&query.user_id, &query.query)
        .await?;
    Ok(Json(json!({ "status": "success", "users": users })))
}
