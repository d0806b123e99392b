use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Itinerary, Leg, PriceBreakdown};

/// A committed booking. Written once inside a single transaction together
/// with its legs/segments/layovers; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub conversation_id: String,
    pub booking_reference: String,
    pub passenger_names: Vec<String>,
    pub email: String,
    pub phone: String,
    pub payment_method: Option<String>,
    pub airlines: Vec<String>,
    pub total_price: f64,
    pub currency: String,
    pub provider_token: Option<String>,
    pub is_multi_city: bool,
    pub price_breakdown: PriceBreakdown,
    pub created_at: DateTime<Utc>,
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookFlightRequest {
    pub selected_itinerary_id: String,
    /// Fallback when the conversation cache no longer holds the itinerary.
    pub inline_itinerary: Option<Itinerary>,
    pub passenger_names: Vec<String>,
    pub email: String,
    pub phone: String,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub booking_reference: String,
    pub message: String,
}
