//! Repost and like posts.
//!
//! A local post whose body marks it as a repost (or like) of a remote URL
//! federates as a bare `Announce` (or `Like`) of that URL instead of a
//! `Create`/`Update` of the post. The first such activity is kept so a later
//! delete can undo it.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use apub_host::ContentStore;
use apub_model::{MetaKey, ObjectRef, TargetKind, Verb, WireObject};

use super::{Stage, StageContext, StageOutcome};
use crate::error::Result;

struct Reaction {
    name: &'static str,
    verb: Verb,
    target: TargetKind,
    record: MetaKey,
    store: Arc<dyn ContentStore>,
}

impl Reaction {
    async fn apply(&self, wire: &mut WireObject, ctx: &StageContext<'_>) -> Result<StageOutcome> {
        if !matches!(wire.verb(), Some(Verb::Create | Verb::Update)) {
            return Ok(StageOutcome::Unchanged);
        }

        let id = ctx.item.id;
        let url = self.store.get_meta(id, self.target.url_key()).await?;
        let Some(url) = url.as_ref().and_then(Value::as_str).filter(|url| !url.is_empty()) else {
            return Ok(StageOutcome::Unchanged);
        };

        let Some(activity) = wire.as_activity_mut() else {
            return Ok(StageOutcome::Unchanged);
        };

        activity.retain_minimal();
        activity.kind = self.verb.as_str().to_string();
        activity.object = ObjectRef::Link(url.to_string());

        if self.store.get_meta(id, self.record).await?.is_none() {
            let value = serde_json::to_value(&*activity)?;
            self.store.set_meta(id, self.record, value).await?;
            debug!(content_id = id, verb = %self.verb, target = %url, "Stored reaction activity");
        }

        Ok(StageOutcome::Rewritten)
    }
}

pub struct RepostStage(Reaction);

impl RepostStage {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self(Reaction {
            name: "repost",
            verb: Verb::Announce,
            target: TargetKind::RepostOf,
            record: MetaKey::AnnounceActivity,
            store,
        })
    }
}

#[async_trait]
impl Stage for RepostStage {
    fn name(&self) -> &'static str {
        self.0.name
    }

    async fn apply(&self, wire: &mut WireObject, ctx: &StageContext<'_>) -> Result<StageOutcome> {
        self.0.apply(wire, ctx).await
    }
}

pub struct LikeStage(Reaction);

impl LikeStage {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self(Reaction {
            name: "like",
            verb: Verb::Like,
            target: TargetKind::LikeOf,
            record: MetaKey::LikeActivity,
            store,
        })
    }
}

#[async_trait]
impl Stage for LikeStage {
    fn name(&self) -> &'static str {
        self.0.name
    }

    async fn apply(&self, wire: &mut WireObject, ctx: &StageContext<'_>) -> Result<StageOutcome> {
        self.0.apply(wire, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apub_host::MemoryContentStore;
    use apub_model::{Activity, BaseObject, ContentItem, PUBLIC_AUDIENCE};
    use serde_json::json;

    const TARGET: &str = "https://remote.example/@alice/7";

    fn wire(verb: Verb) -> WireObject {
        let mut object = BaseObject::new("Note")
            .with_id("https://blog.example/?p=42")
            .with_audience(vec![PUBLIC_AUDIENCE.to_string()], vec![])
            .with_content("en", "<p>Reposting this</p>");
        object.published = Some("2024-05-01T10:00:00Z".to_string());
        let mut activity = Activity::wrap(verb, "https://blog.example/author/jan", object)
            .with_id("https://blog.example/?p=42#activity");
        activity.updated = Some("2024-05-01T10:05:00Z".to_string());
        activity.extra.insert("sensitive".to_string(), json!(false));
        WireObject::Activity(activity)
    }

    #[tokio::test]
    async fn test_repost_becomes_minimal_announce() {
        let store = Arc::new(MemoryContentStore::new());
        store.set_meta(42, MetaKey::RepostOfUrl, json!(TARGET)).await.unwrap();
        let stage = RepostStage::new(store.clone());
        let item = ContentItem::post(42, "https://blog.example/?p=42");

        let mut w = wire(Verb::Create);
        let ctx = StageContext { item: &item, rendering: false };
        assert_eq!(stage.apply(&mut w, &ctx).await.unwrap(), StageOutcome::Rewritten);

        let value = w.to_value().unwrap();
        assert_eq!(value["type"], "Announce");
        assert_eq!(value["object"], TARGET);
        assert_eq!(value["id"], "https://blog.example/?p=42#activity");
        assert_eq!(value["to"], json!([PUBLIC_AUDIENCE]));
        assert!(value.get("updated").is_none());
        assert!(value.get("sensitive").is_none());

        assert_eq!(store.meta(42, MetaKey::AnnounceActivity), Some(value));
    }

    #[tokio::test]
    async fn test_stored_record_is_not_overwritten() {
        let store = Arc::new(MemoryContentStore::new());
        store.set_meta(42, MetaKey::LikeOfUrl, json!(TARGET)).await.unwrap();
        let stage = LikeStage::new(store.clone());
        let item = ContentItem::post(42, "https://blog.example/?p=42");
        let ctx = StageContext { item: &item, rendering: false };

        let mut first = wire(Verb::Create);
        stage.apply(&mut first, &ctx).await.unwrap();
        let stored = store.meta(42, MetaKey::LikeActivity).unwrap();
        assert_eq!(stored["type"], "Like");

        let mut update = wire(Verb::Update);
        if let Some(activity) = update.as_activity_mut() {
            activity.id = Some("https://blog.example/?p=42#update".to_string());
        }
        stage.apply(&mut update, &ctx).await.unwrap();
        assert_eq!(store.meta(42, MetaKey::LikeActivity), Some(stored));
    }

    #[tokio::test]
    async fn test_plain_posts_and_deletes_untouched() {
        let store = Arc::new(MemoryContentStore::new());
        let stage = RepostStage::new(store.clone());
        let item = ContentItem::post(42, "https://blog.example/?p=42");
        let ctx = StageContext { item: &item, rendering: false };

        let mut plain = wire(Verb::Create);
        assert_eq!(stage.apply(&mut plain, &ctx).await.unwrap(), StageOutcome::Unchanged);

        store.set_meta(42, MetaKey::RepostOfUrl, json!(TARGET)).await.unwrap();
        let mut delete = wire(Verb::Delete);
        assert_eq!(stage.apply(&mut delete, &ctx).await.unwrap(), StageOutcome::Unchanged);
        assert!(store.meta(42, MetaKey::AnnounceActivity).is_none());
    }
}
