use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::dto::quiz_dto::RefineInterestPayload;
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn refine_interest(
    State(state): State<AppState>,
    Json(payload): Json<RefineInterestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let refined = state
        .refine_service
        .refine_interest(&payload.interest, &payload.history)
        .await?;
    Ok(Json(refined))
}
