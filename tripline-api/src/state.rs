use std::sync::Arc;

use tripline_booking::{BookingService, LastBookingService};
use tripline_provider::SearchOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SearchOrchestrator>,
    pub booking: Arc<BookingService>,
    pub retrieval: Arc<LastBookingService>,
}
