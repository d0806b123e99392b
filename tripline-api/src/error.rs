use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tripline_core::EngineError;

/// Boundary mapping of the engine's error taxonomy onto HTTP. Failures are
/// always a structured error body, never a success envelope with an error
/// string inside.
#[derive(Debug)]
pub struct AppError(pub EngineError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            EngineError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            EngineError::ProviderUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            EngineError::NoResults => (StatusCode::NOT_FOUND, self.0.to_string()),
            EngineError::BookingDataMissing => (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string()),
            EngineError::NotFound => (StatusCode::NOT_FOUND, self.0.to_string()),
            EngineError::Persistence(msg) => {
                tracing::error!("Persistence failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Persistence failure".to_string())
            }
            EngineError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}
