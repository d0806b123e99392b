use async_trait::async_trait;

use crate::booking::Booking;
use crate::EngineResult;

/// Repository trait for booking persistence. The insert is all-or-nothing:
/// a failure while writing any child row must leave no partial booking
/// visible.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: &Booking) -> EngineResult<()>;

    /// Most recent booking for a user across all conversations, with
    /// legs/segments/layovers loaded.
    async fn latest_for_user(&self, user_id: &str) -> EngineResult<Option<Booking>>;
}
