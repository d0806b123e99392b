use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;

use tripline_core::context::ContextStore;
use tripline_core::{EngineError, EngineResult};

/// Distributed context backend: one Redis hash per (user, conversation)
/// scope, refreshed to the idle TTL on every write.
#[derive(Clone)]
pub struct RedisContextStore {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisContextStore {
    pub fn new(connection_string: &str, ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client, ttl_seconds })
    }

    fn scope_key(user_id: &str, conversation_id: &str) -> String {
        format!("ctx:{}:{}", user_id, conversation_id)
    }

    async fn connection(&self) -> EngineResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_err)
    }
}

#[async_trait]
impl ContextStore for RedisContextStore {
    async fn set(
        &self,
        user_id: &str,
        conversation_id: &str,
        key: &str,
        value: Value,
    ) -> EngineResult<()> {
        let mut conn = self.connection().await?;
        let scope = Self::scope_key(user_id, conversation_id);
        let payload = serde_json::to_string(&value)
            .map_err(|e| EngineError::Internal(format!("context value serialization: {e}")))?;
        conn.hset::<_, _, _, ()>(&scope, key, payload)
            .await
            .map_err(redis_err)?;
        conn.expire::<_, ()>(&scope, self.ttl_seconds as i64)
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn get(
        &self,
        user_id: &str,
        conversation_id: &str,
        key: &str,
    ) -> EngineResult<Option<Value>> {
        let mut conn = self.connection().await?;
        let scope = Self::scope_key(user_id, conversation_id);
        let payload: Option<String> = conn.hget(&scope, key).await.map_err(redis_err)?;
        payload
            .map(|p| {
                serde_json::from_str(&p)
                    .map_err(|e| EngineError::Internal(format!("stored context unreadable: {e}")))
            })
            .transpose()
    }

    async fn get_all(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> EngineResult<HashMap<String, Value>> {
        let mut conn = self.connection().await?;
        let scope = Self::scope_key(user_id, conversation_id);
        let raw: HashMap<String, String> = conn.hgetall(&scope).await.map_err(redis_err)?;
        raw.into_iter()
            .map(|(key, payload)| {
                serde_json::from_str(&payload)
                    .map(|value| (key, value))
                    .map_err(|e| EngineError::Internal(format!("stored context unreadable: {e}")))
            })
            .collect()
    }

    async fn clear(&self, user_id: &str, conversation_id: &str) -> EngineResult<()> {
        let mut conn = self.connection().await?;
        let scope = Self::scope_key(user_id, conversation_id);
        conn.del::<_, ()>(&scope).await.map_err(redis_err)?;
        Ok(())
    }
}

fn redis_err(e: redis::RedisError) -> EngineError {
    EngineError::Internal(format!("context store failure: {e}"))
}
