//! Content and transient storage.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use apub_model::{ContentId, ContentItem, MetaKey};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;

/// The host's content store: items plus namespaced per-item metadata.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Load the current revision of an item.
    async fn get_item(&self, id: ContentId) -> Result<Option<ContentItem>>;

    async fn get_meta(&self, id: ContentId, key: MetaKey) -> Result<Option<Value>>;

    async fn set_meta(&self, id: ContentId, key: MetaKey, value: Value) -> Result<()>;

    async fn delete_meta(&self, id: ContentId, key: MetaKey) -> Result<()>;

    /// Map an ActivityPub object ID back to the local item it federates.
    async fn resolve_from_object_id(&self, object_id: &str) -> Result<Option<ContentItem>>;
}

/// Time-bounded key/value entries (retry countdowns, remote GET cache).
#[async_trait]
pub trait TransientStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value`, expiring it after `ttl`.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory content store.
#[derive(Default)]
pub struct MemoryContentStore {
    items: DashMap<ContentId, ContentItem>,
    meta: DashMap<(ContentId, MetaKey), Value>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item.
    pub fn put_item(&self, item: ContentItem) {
        self.items.insert(item.id, item);
    }

    /// Synchronous metadata peek.
    pub fn meta(&self, id: ContentId, key: MetaKey) -> Option<Value> {
        self.meta.get(&(id, key)).map(|v| v.clone())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn get_item(&self, id: ContentId) -> Result<Option<ContentItem>> {
        Ok(self.items.get(&id).map(|item| item.clone()))
    }

    async fn get_meta(&self, id: ContentId, key: MetaKey) -> Result<Option<Value>> {
        Ok(self.meta(id, key))
    }

    async fn set_meta(&self, id: ContentId, key: MetaKey, value: Value) -> Result<()> {
        self.meta.insert((id, key), value);
        Ok(())
    }

    async fn delete_meta(&self, id: ContentId, key: MetaKey) -> Result<()> {
        self.meta.remove(&(id, key));
        Ok(())
    }

    async fn resolve_from_object_id(&self, object_id: &str) -> Result<Option<ContentItem>> {
        Ok(self
            .items
            .iter()
            .find(|entry| entry.federated_id == object_id)
            .map(|entry| entry.value().clone()))
    }
}

#[derive(Debug, Clone)]
struct TransientEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// In-memory transient store; entries vanish once their TTL has passed.
pub struct MemoryTransientStore {
    entries: DashMap<String, TransientEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryTransientStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "Purged expired transient entries");
        }
        purged
    }
}

impl Default for MemoryTransientStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransientStore for MemoryTransientStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }

        if self
            .entries
            .remove_if(key, |_, entry| entry.expires_at <= now)
            .is_some()
        {
            debug!(key = %key, "Transient entry expired");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.purge_expired();
        let expires_at = self.clock.now() + ttl;
        self.entries
            .insert(key.to_string(), TransientEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    #[tokio::test]
    async fn test_content_store_meta() {
        let store = MemoryContentStore::new();
        store.put_item(ContentItem::post(42, "https://blog.example/?p=42"));

        assert!(store.get_meta(42, MetaKey::Fingerprint).await.unwrap().is_none());
        store
            .set_meta(42, MetaKey::Fingerprint, json!("abc"))
            .await
            .unwrap();
        assert_eq!(
            store.get_meta(42, MetaKey::Fingerprint).await.unwrap(),
            Some(json!("abc"))
        );

        store.delete_meta(42, MetaKey::Fingerprint).await.unwrap();
        assert!(store.meta(42, MetaKey::Fingerprint).is_none());
    }

    #[tokio::test]
    async fn test_resolve_from_object_id() {
        let store = MemoryContentStore::new();
        store.put_item(ContentItem::post(7, "https://blog.example/?p=7"));

        let found = store
            .resolve_from_object_id("https://blog.example/?p=7")
            .await
            .unwrap();
        assert_eq!(found.map(|i| i.id), Some(7));

        let missing = store
            .resolve_from_object_id("https://elsewhere.example/1")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_transient_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryTransientStore::with_clock(clock.clone());

        store
            .set("retries:abc", json!(3), Duration::seconds(3600))
            .await
            .unwrap();
        assert_eq!(store.get("retries:abc").await.unwrap(), Some(json!(3)));

        clock.advance(Duration::seconds(3599));
        assert!(store.get("retries:abc").await.unwrap().is_some());

        clock.advance(Duration::seconds(1));
        assert!(store.get("retries:abc").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_evicts_expired_entries() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryTransientStore::with_clock(clock.clone());

        for i in 0..100 {
            store
                .set(&format!("remote_get:{i}"), json!(i), Duration::seconds(300))
                .await
                .unwrap();
        }
        assert_eq!(store.entries.len(), 100);

        clock.advance(Duration::days(30));
        store
            .set("retries:fresh", json!(3), Duration::seconds(3600))
            .await
            .unwrap();

        assert_eq!(store.entries.len(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_expired(), 0);
    }
}
