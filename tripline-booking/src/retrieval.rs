use std::sync::Arc;

use serde::Serialize;

use tripline_core::booking::Booking;
use tripline_core::repository::BookingRepository;
use tripline_core::{EngineError, EngineResult};

/// Most recent booking for a user, across conversations, with its legs,
/// segments and layovers loaded and a rendered summary attached.
pub struct LastBookingService {
    repository: Arc<dyn BookingRepository>,
}

#[derive(Debug, Serialize)]
pub struct LastBookingSummary {
    pub booking: Booking,
    pub message: String,
}

impl LastBookingService {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self { repository }
    }

    pub async fn last_booking(&self, user_id: &str) -> EngineResult<LastBookingSummary> {
        let booking = self
            .repository
            .latest_for_user(user_id)
            .await?
            .ok_or(EngineError::NotFound)?;
        let message = render_summary(&booking);
        Ok(LastBookingSummary { booking, message })
    }
}

pub fn render_summary(booking: &Booking) -> String {
    let mut parts = vec![
        "## Your Last Flight Booking Details".to_string(),
        format!("- **Booking Reference:** {}", booking.booking_reference),
        format!("- **Passengers:** {}", booking.passenger_names.join(", ")),
        format!("- **Email:** {}", booking.email),
        format!("- **Phone:** {}", booking.phone),
        format!(
            "- **Airline(s):** {}",
            if booking.airlines.is_empty() {
                "N/A".to_string()
            } else {
                booking.airlines.join(", ")
            }
        ),
        format!("- **Total Price:** {} {}", booking.currency, booking.total_price),
        format!(
            "- **Booking Date:** {}",
            booking.created_at.format("%Y-%m-%d %H:%M")
        ),
    ];

    if booking.is_multi_city {
        parts.push("\n### Multi-City Itinerary".to_string());
    }

    for (index, leg) in booking.legs.iter().enumerate() {
        let label = if booking.is_multi_city { "Leg" } else { "Flight" };
        parts.push(format!("\n### {} {}", label, index + 1));
        parts.push(format!("- **From:** {} → **To:** {}", leg.origin, leg.destination));
        parts.push(format!("- **Departure:** {}", leg.departure_at.format("%Y-%m-%d %H:%M")));
        parts.push(format!("- **Arrival:** {}", leg.arrival_at.format("%Y-%m-%d %H:%M")));
        parts.push(format!("- **Duration:** {}", leg.total_duration));
        parts.push(format!("- **Stops:** {}", leg.stops));

        if !leg.segments.is_empty() {
            parts.push("\n#### Flight Segments".to_string());
            for segment in &leg.segments {
                parts.push(format!("- **Segment {}**", segment.segment_number));
                parts.push(format!("  - **Airline:** {}", segment.airlines.join(", ")));
                parts.push(format!(
                    "  - **Flight Number:** {}",
                    segment.flight_number.as_deref().unwrap_or("N/A")
                ));
                parts.push(format!(
                    "  - **From:** {} at {}",
                    segment.departure_airport,
                    segment.departure_at.format("%Y-%m-%d %H:%M")
                ));
                parts.push(format!(
                    "  - **To:** {} at {}",
                    segment.arrival_airport,
                    segment.arrival_at.format("%Y-%m-%d %H:%M")
                ));
                parts.push(format!("  - **Duration:** {}", segment.duration));
                parts.push(format!("  - **Cabin Class:** {}", segment.cabin_class));
                if !segment.extension_info.is_empty() {
                    parts.push(format!("  - **Extra Info:** {}", segment.extension_info.join("; ")));
                }
            }
        }

        if !leg.layovers.is_empty() {
            parts.push("\n#### Layovers".to_string());
            for layover in &leg.layovers {
                parts.push(format!(
                    "- At **{}** for **{}**",
                    layover.layover_airport, layover.layover_duration
                ));
            }
        }
    }

    parts.push("\n## Price Breakdown".to_string());
    let breakdown = &booking.price_breakdown;
    parts.push(format!(
        "- Base Fare per Person: {} {}",
        booking.currency, breakdown.base_fare_per_person
    ));
    for (label, entry) in [
        ("Adults", &breakdown.adults),
        ("Children", &breakdown.children),
        ("Infants", &breakdown.infants),
    ] {
        if let Some(entry) = entry {
            parts.push(format!(
                "- {}: {} × base → {} {}",
                label, entry.count, booking.currency, entry.total
            ));
        }
    }
    parts.push(format!(
        "\n**Total Cost:** {} {}",
        booking.currency, booking.total_price
    ));

    parts.join("\n")
}
