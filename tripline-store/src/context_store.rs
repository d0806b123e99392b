use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use tripline_core::context::ContextStore;
use tripline_core::EngineResult;

struct ScopeEntry {
    values: HashMap<String, Value>,
    touched_at: Instant,
}

/// In-process context backend. DashMap shards keep distinct
/// (user, conversation) scopes from contending on one lock; a per-scope
/// idle TTL keeps long-dead conversations from accumulating.
pub struct MemoryContextStore {
    scopes: DashMap<(String, String), ScopeEntry>,
    ttl: Option<Duration>,
}

impl MemoryContextStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self { scopes: DashMap::new(), ttl }
    }

    fn expired(&self, entry: &ScopeEntry) -> bool {
        self.ttl
            .map(|ttl| entry.touched_at.elapsed() > ttl)
            .unwrap_or(false)
    }

    /// Drop every scope past its idle TTL. Called opportunistically by the
    /// owner; reads and writes already evict the scope they touch.
    pub fn purge_expired(&self) {
        self.scopes.retain(|_, entry| !self.expired(entry));
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    async fn set(
        &self,
        user_id: &str,
        conversation_id: &str,
        key: &str,
        value: Value,
    ) -> EngineResult<()> {
        let scope = (user_id.to_string(), conversation_id.to_string());
        let mut entry = self.scopes.entry(scope).or_insert_with(|| ScopeEntry {
            values: HashMap::new(),
            touched_at: Instant::now(),
        });
        if self.expired(&entry) {
            entry.values.clear();
        }
        entry.values.insert(key.to_string(), value);
        entry.touched_at = Instant::now();
        Ok(())
    }

    async fn get(
        &self,
        user_id: &str,
        conversation_id: &str,
        key: &str,
    ) -> EngineResult<Option<Value>> {
        let scope = (user_id.to_string(), conversation_id.to_string());
        let Some(entry) = self.scopes.get(&scope) else {
            return Ok(None);
        };
        if self.expired(&entry) {
            drop(entry);
            self.scopes.remove(&scope);
            return Ok(None);
        }
        Ok(entry.values.get(key).cloned())
    }

    async fn get_all(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> EngineResult<HashMap<String, Value>> {
        let scope = (user_id.to_string(), conversation_id.to_string());
        let Some(entry) = self.scopes.get(&scope) else {
            return Ok(HashMap::new());
        };
        if self.expired(&entry) {
            drop(entry);
            self.scopes.remove(&scope);
            return Ok(HashMap::new());
        }
        Ok(entry.values.clone())
    }

    async fn clear(&self, user_id: &str, conversation_id: &str) -> EngineResult<()> {
        let scope = (user_id.to_string(), conversation_id.to_string());
        self.scopes.remove(&scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_get_all_clear_roundtrip() {
        let store = MemoryContextStore::new(None);
        store.set("u1", "c1", "k1", json!("v1")).await.unwrap();
        store.set("u1", "c1", "k2", json!(42)).await.unwrap();

        assert_eq!(store.get("u1", "c1", "k1").await.unwrap(), Some(json!("v1")));
        assert_eq!(store.get("u1", "c1", "missing").await.unwrap(), None);
        assert_eq!(store.get_all("u1", "c1").await.unwrap().len(), 2);

        store.clear("u1", "c1").await.unwrap();
        assert_eq!(store.get("u1", "c1", "k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_or_falls_back_to_supplied_default() {
        let store = MemoryContextStore::new(None);
        let value = store
            .get_or("u1", "c1", "missing", json!("fallback"))
            .await
            .unwrap();
        assert_eq!(value, json!("fallback"));
    }

    #[tokio::test]
    async fn scopes_are_isolated_per_user_and_conversation() {
        let store = MemoryContextStore::new(None);
        store.set("u1", "c1", "k", json!("a")).await.unwrap();
        store.set("u1", "c2", "k", json!("b")).await.unwrap();
        store.set("u2", "c1", "k", json!("c")).await.unwrap();

        assert_eq!(store.get("u1", "c1", "k").await.unwrap(), Some(json!("a")));
        assert_eq!(store.get("u1", "c2", "k").await.unwrap(), Some(json!("b")));
        assert_eq!(store.get("u2", "c1", "k").await.unwrap(), Some(json!("c")));

        store.clear("u1", "c1").await.unwrap();
        assert_eq!(store.get("u1", "c2", "k").await.unwrap(), Some(json!("b")));
    }

    #[tokio::test]
    async fn idle_scopes_expire_after_ttl() {
        let store = MemoryContextStore::new(Some(Duration::from_millis(20)));
        store.set("u1", "c1", "k", json!("v")).await.unwrap();
        assert_eq!(store.get("u1", "c1", "k").await.unwrap(), Some(json!("v")));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("u1", "c1", "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn purge_drops_only_expired_scopes() {
        let store = MemoryContextStore::new(Some(Duration::from_millis(30)));
        store.set("u1", "old", "k", json!("v")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.set("u1", "fresh", "k", json!("v")).await.unwrap();

        store.purge_expired();
        assert_eq!(store.scope_count(), 1);
        assert_eq!(store.get("u1", "fresh", "k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn concurrent_writes_to_distinct_scopes_do_not_interfere() {
        let store = std::sync::Arc::new(MemoryContextStore::new(None));
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let conversation = format!("c{i}");
                for turn in 0..50 {
                    store
                        .set("u1", &conversation, "turn", json!(turn))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        for i in 0..16 {
            let conversation = format!("c{i}");
            assert_eq!(
                store.get("u1", &conversation, "turn").await.unwrap(),
                Some(json!(49))
            );
        }
    }
}
