use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use tripline_core::booking::{BookFlightRequest, BookingConfirmation};
use tripline_core::model::Itinerary;
use tripline_core::search::SearchRequest;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/search", post(search_flights))
        .route("/v1/flights/book", post(book_flight))
}

#[derive(Debug, Deserialize)]
struct SearchApiRequest {
    user_id: String,
    conversation_id: String,
    #[serde(flatten)]
    search: SearchRequest,
}

#[derive(Debug, Serialize)]
struct SearchApiResponse {
    itineraries: Vec<Itinerary>,
}

async fn search_flights(
    State(state): State<AppState>,
    Json(req): Json<SearchApiRequest>,
) -> Result<Json<SearchApiResponse>, AppError> {
    let itineraries = state
        .orchestrator
        .search(&req.user_id, &req.conversation_id, &req.search)
        .await?;
    info!(count = itineraries.len(), user_id = %req.user_id, "Search request served");
    Ok(Json(SearchApiResponse { itineraries }))
}

#[derive(Debug, Deserialize)]
struct BookApiRequest {
    user_id: String,
    conversation_id: String,
    #[serde(flatten)]
    booking: BookFlightRequest,
}

async fn book_flight(
    State(state): State<AppState>,
    Json(req): Json<BookApiRequest>,
) -> Result<Json<BookingConfirmation>, AppError> {
    let confirmation = state
        .booking
        .book(&req.user_id, &req.conversation_id, &req.booking)
        .await?;
    Ok(Json(confirmation))
}
