//! Change-hash tracking: suppress Updates that change nothing remote
//! servers would see.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use apub_host::ContentStore;
use apub_model::{ContentItem, ContentKind, MetaKey, Verb, WireObject};

use crate::error::Result;

/// Custom fingerprinting, replacing the default field set.
pub trait FingerprintHook: Send + Sync {
    /// Return `None` to fall back to the default fingerprint.
    fn fingerprint(&self, item: &ContentItem, activity: &WireObject) -> Option<String>;
}

/// The fields that end up in a federated object, in a fixed order.
#[derive(Serialize)]
struct FederatableFields<'a> {
    slug: &'a str,
    title: String,
    excerpt: String,
    body: String,
    content_type: &'a str,
    tags: Vec<&'a str>,
}

impl<'a> FederatableFields<'a> {
    fn of(item: &'a ContentItem) -> Self {
        let mut tags: Vec<&str> = item.tags.iter().map(String::as_str).collect();
        tags.sort_unstable();
        tags.dedup();

        Self {
            slug: &item.slug,
            title: normalize_newlines(&item.title),
            excerpt: normalize_newlines(&item.excerpt),
            body: normalize_newlines(&item.body),
            content_type: &item.content_type,
            tags,
        }
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Compute SHA256 hash of content.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Default fingerprint of an item's federatable fields.
pub fn compute_fingerprint(item: &ContentItem) -> String {
    let json = serde_json::to_string(&FederatableFields::of(item)).unwrap_or_default();
    compute_hash(json.as_bytes())
}

/// Decides whether an Update is worth sending.
pub struct ChangeHashTracker {
    store: Arc<dyn ContentStore>,
    hook: Option<Arc<dyn FingerprintHook>>,
    enabled: bool,
}

impl ChangeHashTracker {
    pub fn new(store: Arc<dyn ContentStore>, enabled: bool) -> Self {
        Self {
            store,
            hook: None,
            enabled,
        }
    }

    /// Install a custom fingerprint hook.
    pub fn with_hook(mut self, hook: Arc<dyn FingerprintHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Whether `activity` should go out. Only Updates of posts are ever
    /// suppressed; the stored fingerprint moves only when a send is allowed.
    pub async fn should_send_update(&self, item: &ContentItem, activity: &WireObject) -> Result<bool> {
        if !self.enabled || activity.verb() != Some(Verb::Update) {
            return Ok(true);
        }

        // Comments carry no federatable field set of their own.
        if item.kind != ContentKind::Post {
            return Ok(true);
        }

        let new_hash = self
            .hook
            .as_ref()
            .and_then(|hook| hook.fingerprint(item, activity))
            .unwrap_or_else(|| compute_fingerprint(item));

        let old_hash = self.store.get_meta(item.id, MetaKey::Fingerprint).await?;
        let old_hash = old_hash.as_ref().and_then(Value::as_str).unwrap_or_default();

        if !old_hash.is_empty() && old_hash == new_hash {
            debug!(content_id = item.id, "Federated fields unchanged, suppressing Update");
            return Ok(false);
        }

        self.store
            .set_meta(item.id, MetaKey::Fingerprint, Value::String(new_hash))
            .await?;
        Ok(true)
    }
}
