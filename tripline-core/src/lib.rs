pub mod booking;
pub mod context;
pub mod model;
pub mod pricing;
pub mod repository;
pub mod search;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Flight search provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("No matching flight options found")]
    NoResults,
    #[error("No flight data available to book")]
    BookingDataMissing,
    #[error("Persistence failure: {0}")]
    Persistence(String),
    #[error("No booking found")]
    NotFound,
    #[error("Internal service error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
