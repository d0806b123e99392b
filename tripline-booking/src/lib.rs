pub mod retrieval;
pub mod service;

pub use retrieval::{LastBookingService, LastBookingSummary};
pub use service::BookingService;
