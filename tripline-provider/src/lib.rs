pub mod client;
pub mod normalize;
pub mod orchestrator;
pub mod payload;

pub use client::{HttpSearchProvider, ProviderConfig, ProviderError, SearchProvider};
pub use orchestrator::SearchOrchestrator;
