use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::dto::quiz_dto::{GenerateQuizPayload, QuizResponse};
use crate::error::Result;
use crate::AppState;

/// Always answers 200 once the payload is valid; failures are reported in
/// the body as `status: "error"`.
#[axum::debug_handler]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state
        .quiz_service
        .generate_quiz(&payload.user_id, &payload.topic, payload.difficulty)
        .await;
    if let QuizResponse::Error { message } = &response {
        tracing::warn!(user_id = %payload.user_id, topic = %payload.topic, %message, "Quiz generation failed");
    }
    Ok(Json(response))
}
