use std::sync::Mutex;

use async_trait::async_trait;

use tripline_core::booking::Booking;
use tripline_core::repository::BookingRepository;
use tripline_core::{EngineError, EngineResult};

/// In-memory booking backend for tests and single-node development runs.
#[derive(Default)]
pub struct MemoryBookingRepository {
    bookings: Mutex<Vec<Booking>>,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.lock().map(|b| b.len()).unwrap_or(0)
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> EngineResult<()> {
        let mut bookings = self
            .bookings
            .lock()
            .map_err(|_| EngineError::Persistence("booking store poisoned".to_string()))?;
        bookings.push(booking.clone());
        Ok(())
    }

    async fn latest_for_user(&self, user_id: &str) -> EngineResult<Option<Booking>> {
        let bookings = self
            .bookings
            .lock()
            .map_err(|_| EngineError::Persistence("booking store poisoned".to_string()))?;
        Ok(bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .max_by_key(|b| b.created_at)
            .cloned())
    }
}
