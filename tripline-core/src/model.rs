use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::search::TripType;

/// One canonical trip candidate produced by the normalizer. Everything
/// downstream (selection, booking, rendering) consumes this one shape and
/// never re-interprets raw provider payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
    /// Opaque engine-generated id, also the session-context cache key.
    pub id: String,
    pub trip_type: TripType,
    pub origin: String,
    pub destination: String,
    pub origin_city: String,
    pub destination_city: String,
    /// Union over every segment of every leg, insertion-ordered, deduplicated.
    pub airlines: Vec<String>,
    /// 1 leg one-way, 2 round-trip (outbound then return), K multi-city.
    pub legs: Vec<Leg>,
    pub total_price: f64,
    pub currency: String,
    pub price_breakdown: PriceBreakdown,
    /// Provider-scoped token reconciling a later booking back to inventory.
    pub booking_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub departure_at: NaiveDateTime,
    pub arrival_at: NaiveDateTime,
    pub origin: String,
    pub destination: String,
    /// Rendered as "{h}h {m}m", zero units dropped.
    pub total_duration: String,
    pub stops: u32,
    /// Ordered by segment_number ascending.
    pub segments: Vec<Segment>,
    pub layovers: Vec<Layover>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub segment_number: u32,
    pub departure_airport: String,
    pub departure_at: NaiveDateTime,
    pub arrival_airport: String,
    pub arrival_at: NaiveDateTime,
    pub duration: String,
    pub cabin_class: String,
    /// Operating airline(s); more than one for codeshares.
    pub airlines: Vec<String>,
    pub flight_number: Option<String>,
    #[serde(default)]
    pub extension_info: Vec<String>,
}

/// Derived from the gap between adjacent segments; not independently
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layover {
    pub layover_airport: String,
    pub layover_duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_fare_per_person: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adults: Option<PriceBreakdownEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<PriceBreakdownEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infants: Option<PriceBreakdownEntry>,
    pub total_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBreakdownEntry {
    pub count: u32,
    pub total: f64,
}

impl Itinerary {
    /// Context-store key under which search results are cached for later
    /// "book option N" turns.
    pub fn context_key(id: &str) -> String {
        format!("itinerary_{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_categories_are_absent_from_json() {
        let breakdown = PriceBreakdown {
            base_fare_per_person: 500.0,
            adults: Some(PriceBreakdownEntry { count: 2, total: 1000.0 }),
            children: None,
            infants: None,
            total_price: 1000.0,
        };
        let json = serde_json::to_value(&breakdown).unwrap();
        assert!(json.get("adults").is_some());
        assert!(json.get("children").is_none());
        assert!(json.get("infants").is_none());
    }

    #[test]
    fn segment_deserializes_without_extension_info() {
        let json = r#"
            {
                "segment_number": 1,
                "departure_airport": "JFK",
                "departure_at": "2025-12-25T09:15:00",
                "arrival_airport": "LHR",
                "arrival_at": "2025-12-25T21:05:00",
                "duration": "6h 50m",
                "cabin_class": "Economy",
                "airlines": ["British Airways"],
                "flight_number": "BA 178"
            }
        "#;
        let seg: Segment = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(seg.departure_airport, "JFK");
        assert!(seg.extension_info.is_empty());
    }
}
