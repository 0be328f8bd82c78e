//! Undo of reposts and likes.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use apub_host::ContentStore;
use apub_model::{Activity, MetaKey, ObjectRef, Verb, WireObject};

use super::{Stage, StageContext, StageOutcome};
use crate::error::Result;

/// Live reaction records, in the order they are checked.
const RECORDS: [MetaKey; 2] = [MetaKey::AnnounceActivity, MetaKey::LikeActivity];

pub struct UndoStage {
    store: Arc<dyn ContentStore>,
}

impl UndoStage {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for UndoStage {
    fn name(&self) -> &'static str {
        "undo"
    }

    async fn apply(&self, wire: &mut WireObject, ctx: &StageContext<'_>) -> Result<StageOutcome> {
        if wire.verb() != Some(Verb::Delete) {
            return Ok(StageOutcome::Unchanged);
        }
        let Some(activity) = wire.as_activity_mut() else {
            return Ok(StageOutcome::Unchanged);
        };

        let id = ctx.item.id;
        for record in RECORDS {
            let Some(stored) = self.store.get_meta(id, record).await? else {
                continue;
            };
            let stored: Activity = serde_json::from_value(stored)?;

            activity.kind = Verb::Undo.as_str().to_string();
            activity.object = ObjectRef::Activity(Box::new(stored));

            self.store
                .set_meta(id, MetaKey::UndoActivity, serde_json::to_value(&*activity)?)
                .await?;
            self.store.delete_meta(id, record).await?;

            info!(content_id = id, record = record.as_str(), "Undoing reaction");
            return Ok(StageOutcome::Rewritten);
        }

        Ok(StageOutcome::Unchanged)
    }
}
