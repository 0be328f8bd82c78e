//! Outgoing activity transforms.
//!
//! The host serializes a local item into a [`WireObject`]; the pipeline
//! rewrites it before it is rendered or federated. Stages run in a fixed,
//! named order:
//!
//! 1. `unlisted`: move the public marker from `to` to `cc`
//! 2. `replies`: thread replies and trim reply context off the content
//! 3. `timestamps`: drop redundant `updated` values
//! 4. `repost`: turn repost posts into `Announce`
//! 5. `like`: turn like posts into `Like`
//! 6. `undo`: turn deletes of reposts/likes into `Undo`
//!
//! A failing stage is logged and its partial edits discarded; the stages
//! after it still run.

mod reactions;
mod replies;
mod timestamps;
mod undo;
mod unlisted;

pub use reactions::{LikeStage, RepostStage};
pub use replies::{ReplyMentions, ReplyStage, E_CONTENT_PATTERN};
pub use timestamps::TimestampStage;
pub use undo::UndoStage;
pub use unlisted::{make_unlisted, UnlistedPredicate, UnlistedStage};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use apub_host::{ContentRenderer, ContentStore};
use apub_model::{ContentItem, WireObject};

use crate::config::AddonConfig;
use crate::error::Result;

/// What a stage runs against.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    /// The local item the payload was serialized from
    pub item: &'a ContentItem,
    /// True when the payload is rendered for a GET rather than federated
    pub rendering: bool,
}

/// Whether a stage touched the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Unchanged,
    Rewritten,
}

/// One named rewrite step.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self, wire: &mut WireObject, ctx: &StageContext<'_>) -> Result<StageOutcome>;
}

/// Ordered stages applied to every outgoing payload.
pub struct TransformPipeline {
    stages: Vec<Box<dyn Stage>>,
    store: Arc<dyn ContentStore>,
}

impl TransformPipeline {
    /// Build the standard stage order from config.
    pub fn new(config: &AddonConfig, store: Arc<dyn ContentStore>, renderer: Arc<dyn ContentRenderer>) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(UnlistedStage::new(config.unlisted.clone())),
            Box::new(ReplyStage::new(config.replies.enabled, store.clone(), renderer)),
            Box::new(TimestampStage),
            Box::new(RepostStage::new(store.clone())),
            Box::new(LikeStage::new(store.clone())),
            Box::new(UndoStage::new(store.clone())),
        ];

        Self { stages, store }
    }

    /// Build a pipeline from explicit stages.
    pub fn with_stages(stages: Vec<Box<dyn Stage>>, store: Arc<dyn ContentStore>) -> Self {
        Self { stages, store }
    }

    /// Replace the `unlisted` stage's predicate.
    pub fn with_unlisted_predicate(mut self, config: &AddonConfig, predicate: Arc<dyn UnlistedPredicate>) -> Self {
        if let Some(slot) = self.stages.iter_mut().find(|stage| stage.name() == UnlistedStage::NAME) {
            *slot = Box::new(UnlistedStage::new(config.unlisted.clone()).with_predicate(predicate));
        }
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Transform a payload about to be federated.
    pub async fn apply(&self, wire: WireObject, item: &ContentItem) -> WireObject {
        self.run(wire, StageContext { item, rendering: false }).await
    }

    /// Transform a payload about to be served to a remote GET.
    pub async fn render(&self, wire: WireObject, item: &ContentItem) -> WireObject {
        self.run(wire, StageContext { item, rendering: true }).await
    }

    /// Transform a payload, looking its item up from the object ID first.
    /// Payloads about no known local item pass through unchanged.
    pub async fn apply_for_object(&self, wire: WireObject) -> Result<WireObject> {
        self.run_for_object(wire, false).await
    }

    /// [`apply_for_object`](Self::apply_for_object) for rendered payloads.
    pub async fn render_for_object(&self, wire: WireObject) -> Result<WireObject> {
        self.run_for_object(wire, true).await
    }

    async fn run_for_object(&self, wire: WireObject, rendering: bool) -> Result<WireObject> {
        let Some(object_id) = wire.subject_id().map(str::to_string) else {
            return Ok(wire);
        };

        match self.store.resolve_from_object_id(&object_id).await? {
            Some(item) => Ok(self.run(wire, StageContext { item: &item, rendering }).await),
            None => {
                debug!(object_id = %object_id, "No local item for payload");
                Ok(wire)
            }
        }
    }

    async fn run(&self, mut wire: WireObject, ctx: StageContext<'_>) -> WireObject {
        for stage in &self.stages {
            let snapshot = wire.clone();
            match stage.apply(&mut wire, &ctx).await {
                Ok(StageOutcome::Rewritten) => {
                    debug!(stage = stage.name(), content_id = ctx.item.id, "Payload rewritten");
                }
                Ok(StageOutcome::Unchanged) => {}
                Err(e) => {
                    warn!(stage = stage.name(), content_id = ctx.item.id, error = %e, "Stage failed, skipping");
                    wire = snapshot;
                }
            }
        }
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AddonError;
    use apub_host::{MemoryContentStore, PlainRenderer};
    use apub_model::{Activity, Audience, BaseObject, Verb, PUBLIC_AUDIENCE};

    struct Clobber;

    #[async_trait]
    impl Stage for Clobber {
        fn name(&self) -> &'static str {
            "clobber"
        }

        async fn apply(&self, wire: &mut WireObject, _ctx: &StageContext<'_>) -> Result<StageOutcome> {
            wire.to_mut().clear();
            Err(AddonError::Stage {
                stage: "clobber",
                reason: "gave up halfway".to_string(),
            })
        }
    }

    struct Tag;

    #[async_trait]
    impl Stage for Tag {
        fn name(&self) -> &'static str {
            "tag"
        }

        async fn apply(&self, wire: &mut WireObject, _ctx: &StageContext<'_>) -> Result<StageOutcome> {
            wire.cc_mut().push("https://blog.example/followers".to_string());
            Ok(StageOutcome::Rewritten)
        }
    }

    fn create(item: &ContentItem) -> WireObject {
        let object = BaseObject::new("Note")
            .with_id(item.federated_id.clone())
            .with_audience(vec![PUBLIC_AUDIENCE.to_string()], vec![]);
        WireObject::Activity(Activity::wrap(Verb::Create, "https://blog.example/author/jan", object))
    }

    #[test]
    fn test_standard_order() {
        let store = Arc::new(MemoryContentStore::new());
        let pipeline = TransformPipeline::new(&AddonConfig::default(), store, Arc::new(PlainRenderer));
        assert_eq!(
            pipeline.stage_names(),
            vec!["unlisted", "replies", "timestamps", "repost", "like", "undo"]
        );
    }

    #[tokio::test]
    async fn test_failed_stage_is_rolled_back() {
        let store = Arc::new(MemoryContentStore::new());
        let pipeline = TransformPipeline::with_stages(vec![Box::new(Clobber), Box::new(Tag)], store);
        let item = ContentItem::post(1, "https://blog.example/?p=1");

        let out = pipeline.apply(create(&item), &item).await;
        assert_eq!(out.to(), [PUBLIC_AUDIENCE.to_string()]);
        assert_eq!(out.cc(), ["https://blog.example/followers".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_object_passes_through() {
        let store = Arc::new(MemoryContentStore::new());
        let pipeline = TransformPipeline::with_stages(vec![Box::new(Tag)], store);
        let item = ContentItem::post(1, "https://blog.example/?p=1");
        let wire = create(&item);

        let out = pipeline.apply_for_object(wire.clone()).await.unwrap();
        assert_eq!(out, wire);
    }

    #[tokio::test]
    async fn test_apply_for_object_resolves_item() {
        let store = Arc::new(MemoryContentStore::new());
        let item = ContentItem::post(1, "https://blog.example/?p=1");
        store.put_item(item.clone());
        let pipeline = TransformPipeline::with_stages(vec![Box::new(Tag)], store);

        let out = pipeline.apply_for_object(create(&item)).await.unwrap();
        assert!(out.addresses("https://blog.example/followers"));
    }
}
