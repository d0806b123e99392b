use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tripline_core::booking::{BookFlightRequest, Booking, BookingConfirmation};
use tripline_core::context::{keys, ContextStore};
use tripline_core::model::Itinerary;
use tripline_core::repository::BookingRepository;
use tripline_core::search::TripType;
use tripline_core::{EngineError, EngineResult};

/// Commits a selected itinerary into the booking store, exactly once per
/// conversation. Re-booking attempts in the same conversation short-circuit
/// on the cached reference before any row is written.
pub struct BookingService {
    context: Arc<dyn ContextStore>,
    repository: Arc<dyn BookingRepository>,
}

impl BookingService {
    pub fn new(context: Arc<dyn ContextStore>, repository: Arc<dyn BookingRepository>) -> Self {
        Self { context, repository }
    }

    pub async fn book(
        &self,
        user_id: &str,
        conversation_id: &str,
        request: &BookFlightRequest,
    ) -> EngineResult<BookingConfirmation> {
        // 1. Idempotency: an existing reference for this conversation is
        // returned unchanged, with no re-validation and no new row.
        if let Some(reference) = self
            .context
            .get(user_id, conversation_id, keys::LAST_BOOKING_REFERENCE)
            .await?
            .and_then(|v| v.as_str().map(String::from))
        {
            info!(reference, "Booking already confirmed for this conversation");
            return Ok(BookingConfirmation {
                message: format!(
                    "This trip is already booked under reference {reference}."
                ),
                booking_reference: reference,
            });
        }

        // 2. Resolve the itinerary: conversation cache first, inline fallback.
        let itinerary = self.resolve_itinerary(user_id, conversation_id, request).await?;

        if request.passenger_names.is_empty() {
            return Err(EngineError::Validation(
                "at least one passenger name is required".to_string(),
            ));
        }
        if request.email.is_empty() {
            return Err(EngineError::Validation("contact email is required".to_string()));
        }

        // 3. Commit, all-or-nothing.
        let booking_reference = new_booking_reference();
        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            conversation_id: conversation_id.to_string(),
            booking_reference: booking_reference.clone(),
            passenger_names: request.passenger_names.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            payment_method: request.payment_method.clone(),
            airlines: itinerary.airlines.clone(),
            total_price: itinerary.total_price,
            currency: itinerary.currency.clone(),
            provider_token: itinerary.booking_token.clone(),
            is_multi_city: itinerary.trip_type == TripType::MultiCity,
            price_breakdown: itinerary.price_breakdown.clone(),
            created_at: Utc::now(),
            legs: itinerary.legs.clone(),
        };
        self.repository.insert(&booking).await?;

        // 4. Record the outcome for later "last booking" turns.
        self.write_back(user_id, conversation_id, &booking_reference, request, &itinerary)
            .await?;

        info!(reference = %booking_reference, user_id, "Flight booked");
        Ok(BookingConfirmation {
            message: format!(
                "Your flight has been booked successfully!\n\
                 Booking Reference: {booking_reference}\n\
                 A confirmation has been sent to {}. Thank you for choosing our service!",
                request.email
            ),
            booking_reference,
        })
    }

    async fn resolve_itinerary(
        &self,
        user_id: &str,
        conversation_id: &str,
        request: &BookFlightRequest,
    ) -> EngineResult<Itinerary> {
        let cached = self
            .context
            .get(
                user_id,
                conversation_id,
                &Itinerary::context_key(&request.selected_itinerary_id),
            )
            .await?;

        if let Some(value) = cached {
            return serde_json::from_value(value)
                .map_err(|e| EngineError::Internal(format!("cached itinerary unreadable: {e}")));
        }
        request
            .inline_itinerary
            .clone()
            .ok_or(EngineError::BookingDataMissing)
    }

    async fn write_back(
        &self,
        user_id: &str,
        conversation_id: &str,
        reference: &str,
        request: &BookFlightRequest,
        itinerary: &Itinerary,
    ) -> EngineResult<()> {
        let pairs = [
            (keys::LAST_BOOKING_REFERENCE, json!(reference)),
            (keys::LAST_PASSENGER_NAMES, json!(request.passenger_names)),
            (keys::LAST_EMAIL, json!(request.email)),
            (keys::LAST_PHONE, json!(request.phone)),
            (keys::LAST_ITINERARY_ID, json!(itinerary.id)),
        ];
        for (key, value) in pairs {
            self.context.set(user_id, conversation_id, key, value).await?;
        }
        Ok(())
    }
}

/// Short opaque reference in the shape users quote back: 8 uppercase hex
/// characters from a fresh uuid.
fn new_booking_reference() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}
