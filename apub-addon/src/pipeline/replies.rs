//! Reply threading and reply mentions.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use apub_host::{ContentRenderer, ContentStore};
use apub_model::{ContentItem, ContentKind, MetaKey, WireObject};

use super::{Stage, StageContext, StageOutcome};
use crate::error::{AddonError, Result};

/// The reply's own text, without the quoted reply context around it.
pub const E_CONTENT_PATTERN: &str = r#"(?s)<div class="e-content">.+?</div>"#;

/// Stored reply target URL for a post, if any.
async fn reply_url(store: &dyn ContentStore, item: &ContentItem) -> Result<Option<String>> {
    let url = store.get_meta(item.id, MetaKey::InReplyToUrl).await?;
    Ok(url
        .as_ref()
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string))
}

pub struct ReplyStage {
    enabled: bool,
    store: Arc<dyn ContentStore>,
    renderer: Arc<dyn ContentRenderer>,
}

impl ReplyStage {
    pub fn new(enabled: bool, store: Arc<dyn ContentStore>, renderer: Arc<dyn ContentRenderer>) -> Self {
        Self {
            enabled,
            store,
            renderer,
        }
    }
}

#[async_trait]
impl Stage for ReplyStage {
    fn name(&self) -> &'static str {
        "replies"
    }

    async fn apply(&self, wire: &mut WireObject, ctx: &StageContext<'_>) -> Result<StageOutcome> {
        if !self.enabled || ctx.item.kind != ContentKind::Post {
            return Ok(StageOutcome::Unchanged);
        }

        let Some(url) = reply_url(self.store.as_ref(), ctx.item).await? else {
            return Ok(StageOutcome::Unchanged);
        };

        let Some(object) = wire.content_object_mut() else {
            return Ok(StageOutcome::Unchanged);
        };
        object.in_reply_to = Some(url);

        let e_content = Regex::new(E_CONTENT_PATTERN).map_err(|e| AddonError::Stage {
            stage: "replies",
            reason: e.to_string(),
        })?;

        let rendered = self.renderer.render(ctx.item);
        if let Some(fragment) = e_content.find(&rendered) {
            let content = self.renderer.render_federated(ctx.item, fragment.as_str());
            object.replace_content(&content);
        }

        Ok(StageOutcome::Rewritten)
    }
}

/// Adds the reply target's author to the host's mention map, so the reply
/// reaches them.
pub struct ReplyMentions {
    enabled: bool,
    store: Arc<dyn ContentStore>,
}

impl ReplyMentions {
    pub fn new(enabled: bool, store: Arc<dyn ContentStore>) -> Self {
        Self { enabled, store }
    }

    /// Extend `mentions` (`@user@host` to actor URL) for `item`.
    pub async fn extend(&self, item: &ContentItem, mentions: &mut BTreeMap<String, String>) -> Result<()> {
        if !self.enabled || item.kind != ContentKind::Post {
            return Ok(());
        }

        if reply_url(self.store.as_ref(), item).await?.is_none() {
            return Ok(());
        }

        let actor = self.store.get_meta(item.id, MetaKey::InReplyToActor).await?;
        let Some((handle, href)) = actor
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|map| map.iter().next())
            .and_then(|(handle, href)| Some((handle.clone(), href.as_str()?.to_string())))
        else {
            return Ok(());
        };

        if mentions.values().any(|existing| *existing == href) {
            return Ok(());
        }
        mentions.entry(format!("@{handle}")).or_insert(href);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apub_host::{MemoryContentStore, PlainRenderer};
    use apub_model::{Activity, BaseObject, Verb};
    use serde_json::json;

    const TARGET: &str = "https://remote.example/@alice/1";

    struct Fixture {
        store: Arc<MemoryContentStore>,
        stage: ReplyStage,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryContentStore::new());
        let stage = ReplyStage::new(true, store.clone(), Arc::new(PlainRenderer));
        Fixture { store, stage }
    }

    fn create(content: &str) -> WireObject {
        let object = BaseObject::new("Note")
            .with_id("https://blog.example/?p=42")
            .with_content("en", content);
        WireObject::Activity(Activity::wrap(Verb::Create, "https://blog.example/author/jan", object))
    }

    #[tokio::test]
    async fn test_bare_object_reply_is_threaded() {
        let f = fixture();
        let body = r#"<div class="h-cite">Quoted</div><div class="e-content">Same.</div>"#;
        let item = ContentItem::post(42, "https://blog.example/?p=42").with_body(body);
        f.store.set_meta(42, MetaKey::InReplyToUrl, json!(TARGET)).await.unwrap();

        let object = BaseObject::new("Note")
            .with_id("https://blog.example/?p=42")
            .with_content("en", body);
        let mut wire = WireObject::Object(object);
        let ctx = StageContext { item: &item, rendering: true };
        assert_eq!(f.stage.apply(&mut wire, &ctx).await.unwrap(), StageOutcome::Rewritten);

        let WireObject::Object(object) = &wire else {
            panic!("stage changed the wire shape");
        };
        let trimmed = r#"<div class="e-content">Same.</div>"#;
        assert_eq!(object.in_reply_to.as_deref(), Some(TARGET));
        assert_eq!(object.content.as_deref(), Some(trimmed));
        assert_eq!(object.content_map["en"], trimmed);
    }

    #[tokio::test]
    async fn test_reply_gets_in_reply_to_and_trimmed_content() {
        let f = fixture();
        let body = r#"<div class="u-in-reply-to h-cite">Quoted</div><div class="e-content">Agreed!</div>"#;
        let item = ContentItem::post(42, "https://blog.example/?p=42").with_body(body);
        f.store.set_meta(42, MetaKey::InReplyToUrl, json!(TARGET)).await.unwrap();

        let mut wire = create(body);
        let ctx = StageContext { item: &item, rendering: false };
        assert_eq!(f.stage.apply(&mut wire, &ctx).await.unwrap(), StageOutcome::Rewritten);

        let object = wire.content_object().unwrap();
        assert_eq!(object.in_reply_to.as_deref(), Some(TARGET));
        let trimmed = r#"<div class="e-content">Agreed!</div>"#;
        assert_eq!(object.content.as_deref(), Some(trimmed));
        assert_eq!(object.content_map["en"], trimmed);
    }

    #[tokio::test]
    async fn test_content_kept_without_e_content() {
        let f = fixture();
        let item = ContentItem::post(42, "https://blog.example/?p=42").with_body("<p>Plain reply</p>");
        f.store.set_meta(42, MetaKey::InReplyToUrl, json!(TARGET)).await.unwrap();

        let mut wire = create("<p>Plain reply</p>");
        let ctx = StageContext { item: &item, rendering: false };
        f.stage.apply(&mut wire, &ctx).await.unwrap();

        let object = wire.content_object().unwrap();
        assert_eq!(object.in_reply_to.as_deref(), Some(TARGET));
        assert_eq!(object.content.as_deref(), Some("<p>Plain reply</p>"));
    }

    #[tokio::test]
    async fn test_no_target_is_noop() {
        let f = fixture();
        let item = ContentItem::post(42, "https://blog.example/?p=42");
        let mut wire = create("<p>Hi</p>");
        let before = wire.clone();

        let ctx = StageContext { item: &item, rendering: false };
        assert_eq!(f.stage.apply(&mut wire, &ctx).await.unwrap(), StageOutcome::Unchanged);
        assert_eq!(wire, before);
    }

    #[tokio::test]
    async fn test_mentions_take_first_actor_once() {
        let store = Arc::new(MemoryContentStore::new());
        let item = ContentItem::post(42, "https://blog.example/?p=42");
        store.set_meta(42, MetaKey::InReplyToUrl, json!(TARGET)).await.unwrap();
        store
            .set_meta(
                42,
                MetaKey::InReplyToActor,
                json!({ "alice@remote.example": "https://remote.example/users/alice" }),
            )
            .await
            .unwrap();

        let mentions = ReplyMentions::new(true, store);
        let mut map = BTreeMap::new();
        mentions.extend(&item, &mut map).await.unwrap();
        mentions.extend(&item, &mut map).await.unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map["@alice@remote.example"], "https://remote.example/users/alice");
    }

    #[tokio::test]
    async fn test_mentions_need_url_and_actor() {
        let store = Arc::new(MemoryContentStore::new());
        let item = ContentItem::post(42, "https://blog.example/?p=42");
        store
            .set_meta(42, MetaKey::InReplyToActor, json!({ "alice@remote.example": "https://remote.example/users/alice" }))
            .await
            .unwrap();

        let mut map = BTreeMap::new();
        ReplyMentions::new(true, store).extend(&item, &mut map).await.unwrap();
        assert!(map.is_empty());
    }
}
