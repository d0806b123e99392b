use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use tripline_core::EngineError;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/bookings/last/{user_id}", get(last_booking))
}

/// "No prior booking" is a contract outcome with its own body, not an
/// error envelope.
async fn last_booking(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    match state.retrieval.last_booking(&user_id).await {
        Ok(summary) => Ok(Json(summary).into_response()),
        Err(EngineError::NotFound) => {
            Ok((StatusCode::NOT_FOUND, Json(json!({ "not_found": true }))).into_response())
        }
        Err(e) => Err(AppError(e)),
    }
}
