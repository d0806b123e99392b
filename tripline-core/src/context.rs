use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::EngineResult;

/// Per-(user, conversation) ephemeral key/value cache. Backs two flows:
/// search-result caching so "book option 2" resolves without re-querying
/// the provider, and the last-booking-reference record that makes booking
/// idempotent within a conversation.
///
/// Implementations must not serialize access across distinct
/// (user, conversation) scopes behind one global lock.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn set(
        &self,
        user_id: &str,
        conversation_id: &str,
        key: &str,
        value: Value,
    ) -> EngineResult<()>;

    async fn get(
        &self,
        user_id: &str,
        conversation_id: &str,
        key: &str,
    ) -> EngineResult<Option<Value>>;

    async fn get_all(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> EngineResult<HashMap<String, Value>>;

    async fn clear(&self, user_id: &str, conversation_id: &str) -> EngineResult<()>;

    /// Lookup with a caller-supplied default for absent keys.
    async fn get_or(
        &self,
        user_id: &str,
        conversation_id: &str,
        key: &str,
        default: Value,
    ) -> EngineResult<Value> {
        Ok(self.get(user_id, conversation_id, key).await?.unwrap_or(default))
    }
}

/// Context keys written by the booking flow for later convenience lookups.
pub mod keys {
    pub const LAST_BOOKING_REFERENCE: &str = "last_booking_reference";
    pub const LAST_PASSENGER_NAMES: &str = "last_passenger_names";
    pub const LAST_EMAIL: &str = "last_email";
    pub const LAST_PHONE: &str = "last_phone";
    pub const LAST_ITINERARY_ID: &str = "last_itinerary_id";
}
