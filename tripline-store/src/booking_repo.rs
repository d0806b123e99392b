use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use tripline_core::booking::Booking;
use tripline_core::model::{Layover, Leg, Segment};
use tripline_core::repository::BookingRepository;
use tripline_core::{EngineError, EngineResult};

pub struct PgBookingRepository {
    pub pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_leg(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        position: i32,
        leg: &Leg,
    ) -> Result<(), sqlx::Error> {
        let leg_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO booking_legs
                (id, booking_id, position, departure_at, arrival_at, origin, destination, total_duration, stops)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(leg_id)
        .bind(booking_id)
        .bind(position)
        .bind(leg.departure_at)
        .bind(leg.arrival_at)
        .bind(&leg.origin)
        .bind(&leg.destination)
        .bind(&leg.total_duration)
        .bind(leg.stops as i32)
        .execute(&mut **tx)
        .await?;

        for segment in &leg.segments {
            sqlx::query(
                r#"
                INSERT INTO booking_segments
                    (id, booking_id, leg_id, segment_number, departure_airport, departure_at,
                     arrival_airport, arrival_at, duration, cabin_class, airline, flight_number, extension_info)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(booking_id)
            .bind(leg_id)
            .bind(segment.segment_number as i32)
            .bind(&segment.departure_airport)
            .bind(segment.departure_at)
            .bind(&segment.arrival_airport)
            .bind(segment.arrival_at)
            .bind(&segment.duration)
            .bind(&segment.cabin_class)
            .bind(&segment.airlines)
            .bind(&segment.flight_number)
            .bind(&segment.extension_info)
            .execute(&mut **tx)
            .await?;
        }

        for (layover_position, layover) in leg.layovers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO booking_layovers
                    (id, booking_id, leg_id, position, layover_airport, layover_duration)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(booking_id)
            .bind(leg_id)
            .bind(layover_position as i32)
            .bind(&layover.layover_airport)
            .bind(&layover.layover_duration)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert(&self, booking: &Booking) -> EngineResult<()> {
        let breakdown = serde_json::to_value(&booking.price_breakdown)
            .map_err(|e| EngineError::Internal(format!("price breakdown serialization: {e}")))?;

        // Booking row first, then children; a failure anywhere drops the
        // transaction and rolls the whole booking back.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO bookings
                (id, user_id, conversation_id, booking_reference, passenger_names, email, phone,
                 payment_method, airlines, total_price, currency, provider_token, is_multi_city,
                 price_breakdown, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.user_id)
        .bind(&booking.conversation_id)
        .bind(&booking.booking_reference)
        .bind(&booking.passenger_names)
        .bind(&booking.email)
        .bind(&booking.phone)
        .bind(&booking.payment_method)
        .bind(&booking.airlines)
        .bind(booking.total_price)
        .bind(&booking.currency)
        .bind(&booking.provider_token)
        .bind(booking.is_multi_city)
        .bind(breakdown)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for (position, leg) in booking.legs.iter().enumerate() {
            Self::insert_leg(&mut tx, booking.id, position as i32, leg)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        info!(booking_id = %booking.id, reference = %booking.booking_reference, "Booking committed");
        Ok(())
    }

    async fn latest_for_user(&self, user_id: &str) -> EngineResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, conversation_id, booking_reference, passenger_names, email, phone,
                   payment_method, airlines, total_price, currency, provider_token, is_multi_city,
                   price_breakdown, created_at
            FROM bookings
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let leg_rows: Vec<LegRow> = sqlx::query_as(
            r#"
            SELECT id, position, departure_at, arrival_at, origin, destination, total_duration, stops
            FROM booking_legs
            WHERE booking_id = $1
            ORDER BY position
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let segment_rows: Vec<SegmentRow> = sqlx::query_as(
            r#"
            SELECT leg_id, segment_number, departure_airport, departure_at, arrival_airport,
                   arrival_at, duration, cabin_class, airline, flight_number, extension_info
            FROM booking_segments
            WHERE booking_id = $1
            ORDER BY segment_number
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let layover_rows: Vec<LayoverRow> = sqlx::query_as(
            r#"
            SELECT leg_id, position, layover_airport, layover_duration
            FROM booking_layovers
            WHERE booking_id = $1
            ORDER BY position
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut segments_by_leg: HashMap<Uuid, Vec<Segment>> = HashMap::new();
        for seg in segment_rows {
            segments_by_leg.entry(seg.leg_id).or_default().push(Segment {
                segment_number: seg.segment_number as u32,
                departure_airport: seg.departure_airport,
                departure_at: seg.departure_at,
                arrival_airport: seg.arrival_airport,
                arrival_at: seg.arrival_at,
                duration: seg.duration,
                cabin_class: seg.cabin_class,
                airlines: seg.airline,
                flight_number: seg.flight_number,
                extension_info: seg.extension_info,
            });
        }

        let mut layovers_by_leg: HashMap<Uuid, Vec<Layover>> = HashMap::new();
        for lay in layover_rows {
            layovers_by_leg.entry(lay.leg_id).or_default().push(Layover {
                layover_airport: lay.layover_airport,
                layover_duration: lay.layover_duration,
            });
        }

        let legs = leg_rows
            .into_iter()
            .map(|leg| Leg {
                departure_at: leg.departure_at,
                arrival_at: leg.arrival_at,
                origin: leg.origin,
                destination: leg.destination,
                total_duration: leg.total_duration,
                stops: leg.stops as u32,
                segments: segments_by_leg.remove(&leg.id).unwrap_or_default(),
                layovers: layovers_by_leg.remove(&leg.id).unwrap_or_default(),
            })
            .collect();

        let price_breakdown = serde_json::from_value(row.price_breakdown)
            .map_err(|e| EngineError::Persistence(format!("stored price breakdown unreadable: {e}")))?;

        Ok(Some(Booking {
            id: row.id,
            user_id: row.user_id,
            conversation_id: row.conversation_id,
            booking_reference: row.booking_reference,
            passenger_names: row.passenger_names,
            email: row.email,
            phone: row.phone,
            payment_method: row.payment_method,
            airlines: row.airlines,
            total_price: row.total_price,
            currency: row.currency,
            provider_token: row.provider_token,
            is_multi_city: row.is_multi_city,
            price_breakdown,
            created_at: row.created_at,
            legs,
        }))
    }
}

fn db_err(e: sqlx::Error) -> EngineError {
    EngineError::Persistence(e.to_string())
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: String,
    conversation_id: String,
    booking_reference: String,
    passenger_names: Vec<String>,
    email: String,
    phone: String,
    payment_method: Option<String>,
    airlines: Vec<String>,
    total_price: f64,
    currency: String,
    provider_token: Option<String>,
    is_multi_city: bool,
    price_breakdown: serde_json::Value,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LegRow {
    id: Uuid,
    #[allow(dead_code)]
    position: i32,
    departure_at: NaiveDateTime,
    arrival_at: NaiveDateTime,
    origin: String,
    destination: String,
    total_duration: String,
    stops: i32,
}

#[derive(sqlx::FromRow)]
struct SegmentRow {
    leg_id: Uuid,
    segment_number: i32,
    departure_airport: String,
    departure_at: NaiveDateTime,
    arrival_airport: String,
    arrival_at: NaiveDateTime,
    duration: String,
    cabin_class: String,
    airline: Vec<String>,
    flight_number: Option<String>,
    extension_info: Vec<String>,
}

#[derive(sqlx::FromRow)]
struct LayoverRow {
    leg_id: Uuid,
    #[allow(dead_code)]
    position: i32,
    layover_airport: String,
    layover_duration: String,
}
