use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use tripline_booking::{BookingService, LastBookingService};
use tripline_core::booking::BookFlightRequest;
use tripline_core::context::{keys, ContextStore};
use tripline_core::model::{Itinerary, Layover, Leg, PriceBreakdown, PriceBreakdownEntry, Segment};
use tripline_core::search::TripType;
use tripline_core::EngineError;
use tripline_store::{MemoryBookingRepository, MemoryContextStore};

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 12, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn segment(number: u32, from: &str, to: &str, day: u32, depart: u32, arrive: u32) -> Segment {
    Segment {
        segment_number: number,
        departure_airport: from.to_string(),
        departure_at: at(day, depart, 0),
        arrival_airport: to.to_string(),
        arrival_at: at(day, arrive, 0),
        duration: format!("{}h", arrive - depart),
        cabin_class: "Economy".to_string(),
        airlines: vec!["Transatlantic Air".to_string()],
        flight_number: Some(format!("TA {number}0{number}")),
        extension_info: vec![],
    }
}

fn round_trip_itinerary(id: &str) -> Itinerary {
    let outbound = Leg {
        departure_at: at(25, 9, 0),
        arrival_at: at(25, 19, 0),
        origin: "JFK".to_string(),
        destination: "LHR".to_string(),
        total_duration: "10h".to_string(),
        stops: 1,
        segments: vec![segment(1, "JFK", "KEF", 25, 9, 14), segment(2, "KEF", "LHR", 25, 16, 19)],
        layovers: vec![Layover {
            layover_airport: "KEF".to_string(),
            layover_duration: "2h".to_string(),
        }],
    };
    let return_leg = Leg {
        departure_at: at(30, 11, 0),
        arrival_at: at(30, 15, 0),
        origin: "LHR".to_string(),
        destination: "JFK".to_string(),
        total_duration: "4h".to_string(),
        stops: 0,
        segments: vec![segment(1, "LHR", "JFK", 30, 11, 15)],
        layovers: vec![],
    };
    Itinerary {
        id: id.to_string(),
        trip_type: TripType::RoundTrip,
        origin: "JFK".to_string(),
        destination: "LHR".to_string(),
        origin_city: "New York".to_string(),
        destination_city: "London".to_string(),
        airlines: vec!["Transatlantic Air".to_string()],
        legs: vec![outbound, return_leg],
        total_price: 1375.0,
        currency: "USD".to_string(),
        price_breakdown: PriceBreakdown {
            base_fare_per_person: 500.0,
            adults: Some(PriceBreakdownEntry { count: 2, total: 1000.0 }),
            children: Some(PriceBreakdownEntry { count: 1, total: 375.0 }),
            infants: None,
            total_price: 1375.0,
        },
        booking_token: Some("tok-xyz".to_string()),
    }
}

fn book_request(itinerary_id: &str) -> BookFlightRequest {
    BookFlightRequest {
        selected_itinerary_id: itinerary_id.to_string(),
        inline_itinerary: None,
        passenger_names: vec!["Avery Quinn".to_string(), "Rowan Quinn".to_string()],
        email: "avery@example.com".to_string(),
        phone: "+1-555-0100".to_string(),
        payment_method: Some("card".to_string()),
    }
}

struct Harness {
    context: Arc<MemoryContextStore>,
    repository: Arc<MemoryBookingRepository>,
    booking: BookingService,
    retrieval: LastBookingService,
}

fn harness() -> Harness {
    let context = Arc::new(MemoryContextStore::new(None));
    let repository = Arc::new(MemoryBookingRepository::new());
    Harness {
        booking: BookingService::new(context.clone(), repository.clone()),
        retrieval: LastBookingService::new(repository.clone()),
        context,
        repository,
    }
}

async fn cache_itinerary(context: &MemoryContextStore, user: &str, conversation: &str, itinerary: &Itinerary) {
    context
        .set(
            user,
            conversation,
            &Itinerary::context_key(&itinerary.id),
            serde_json::to_value(itinerary).unwrap(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn booking_is_idempotent_per_conversation() {
    let h = harness();
    cache_itinerary(&h.context, "u1", "c1", &round_trip_itinerary("it-1")).await;

    let first = h.booking.book("u1", "c1", &book_request("it-1")).await.unwrap();
    let second = h.booking.book("u1", "c1", &book_request("it-1")).await.unwrap();

    assert_eq!(first.booking_reference, second.booking_reference);
    assert_eq!(h.repository.booking_count(), 1);
}

#[tokio::test]
async fn booking_without_cached_or_inline_itinerary_fails() {
    let h = harness();
    let result = h.booking.book("u1", "c1", &book_request("unknown")).await;
    assert!(matches!(result, Err(EngineError::BookingDataMissing)));
    assert_eq!(h.repository.booking_count(), 0);
}

#[tokio::test]
async fn inline_itinerary_is_used_when_cache_is_cold() {
    let h = harness();
    let mut request = book_request("it-1");
    request.inline_itinerary = Some(round_trip_itinerary("it-1"));

    let confirmation = h.booking.book("u1", "c1", &request).await.unwrap();
    assert_eq!(confirmation.booking_reference.len(), 8);
    assert_eq!(h.repository.booking_count(), 1);
}

#[tokio::test]
async fn booking_requires_passenger_names() {
    let h = harness();
    cache_itinerary(&h.context, "u1", "c1", &round_trip_itinerary("it-1")).await;
    let mut request = book_request("it-1");
    request.passenger_names.clear();

    let result = h.booking.book("u1", "c1", &request).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert_eq!(h.repository.booking_count(), 0);
}

#[tokio::test]
async fn successful_booking_writes_back_conversation_context() {
    let h = harness();
    cache_itinerary(&h.context, "u1", "c1", &round_trip_itinerary("it-1")).await;

    let confirmation = h.booking.book("u1", "c1", &book_request("it-1")).await.unwrap();

    let reference = h.context.get("u1", "c1", keys::LAST_BOOKING_REFERENCE).await.unwrap();
    assert_eq!(reference, Some(serde_json::json!(confirmation.booking_reference)));
    let itinerary_id = h.context.get("u1", "c1", keys::LAST_ITINERARY_ID).await.unwrap();
    assert_eq!(itinerary_id, Some(serde_json::json!("it-1")));
    let email = h.context.get("u1", "c1", keys::LAST_EMAIL).await.unwrap();
    assert_eq!(email, Some(serde_json::json!("avery@example.com")));
}

#[tokio::test]
async fn persist_then_retrieve_reproduces_the_itinerary_shape() {
    let h = harness();
    let itinerary = round_trip_itinerary("it-1");
    cache_itinerary(&h.context, "u1", "c1", &itinerary).await;

    h.booking.book("u1", "c1", &book_request("it-1")).await.unwrap();
    let summary = h.retrieval.last_booking("u1").await.unwrap();

    assert_eq!(summary.booking.legs.len(), itinerary.legs.len());
    let segment_count: usize = summary.booking.legs.iter().map(|l| l.segments.len()).sum();
    let expected: usize = itinerary.legs.iter().map(|l| l.segments.len()).sum();
    assert_eq!(segment_count, expected);
    assert!((summary.booking.total_price - itinerary.total_price).abs() < 1e-6);
    assert!(!summary.booking.is_multi_city);

    assert!(summary.message.contains(&summary.booking.booking_reference));
    assert!(summary.message.contains("Flight 2"));
    assert!(summary.message.contains("At **KEF** for **2h**"));
    assert!(summary.message.contains("Adults: 2"));
    assert!(!summary.message.contains("Infants"));
}

#[tokio::test]
async fn retrieval_without_bookings_is_a_distinguishable_not_found() {
    let h = harness();
    let result = h.retrieval.last_booking("nobody").await;
    assert!(matches!(result, Err(EngineError::NotFound)));
}

#[tokio::test]
async fn concurrent_conversations_never_cross_contaminate() {
    let h = harness();
    cache_itinerary(&h.context, "u1", "c1", &round_trip_itinerary("it-1")).await;
    cache_itinerary(&h.context, "u1", "c2", &round_trip_itinerary("it-2")).await;

    let request_one = book_request("it-1");
    let request_two = book_request("it-2");
    let (first, second) = tokio::join!(
        h.booking.book("u1", "c1", &request_one),
        h.booking.book("u1", "c2", &request_two),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_ne!(first.booking_reference, second.booking_reference);
    assert_eq!(h.repository.booking_count(), 2);

    let c1_ref = h.context.get("u1", "c1", keys::LAST_BOOKING_REFERENCE).await.unwrap();
    let c2_ref = h.context.get("u1", "c2", keys::LAST_BOOKING_REFERENCE).await.unwrap();
    assert_eq!(c1_ref, Some(serde_json::json!(first.booking_reference)));
    assert_eq!(c2_ref, Some(serde_json::json!(second.booking_reference)));
}

#[tokio::test]
async fn fresh_search_can_follow_a_booked_conversation() {
    // A prior BOOKED itinerary does not block caching and reading new
    // search results in the same conversation; only re-booking
    // short-circuits.
    let h = harness();
    cache_itinerary(&h.context, "u1", "c1", &round_trip_itinerary("it-1")).await;
    let first = h.booking.book("u1", "c1", &book_request("it-1")).await.unwrap();

    cache_itinerary(&h.context, "u1", "c1", &round_trip_itinerary("it-9")).await;
    let cached = h
        .context
        .get("u1", "c1", &Itinerary::context_key("it-9"))
        .await
        .unwrap();
    assert!(cached.is_some());

    let again = h.booking.book("u1", "c1", &book_request("it-9")).await.unwrap();
    assert_eq!(again.booking_reference, first.booking_reference);
    assert_eq!(h.repository.booking_count(), 1);
}
