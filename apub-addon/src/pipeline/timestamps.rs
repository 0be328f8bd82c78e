//! `updated` trimming.
//!
//! Some remote servers render any `updated` value as "edited", even on a
//! freshly created post.

use async_trait::async_trait;

use apub_model::{BaseObject, Verb, WireObject};

use super::{Stage, StageContext, StageOutcome};
use crate::error::Result;

fn unedited(published: &Option<String>, updated: &mut Option<String>) -> bool {
    if updated.is_some() && *updated == *published {
        *updated = None;
        return true;
    }
    false
}

fn clear_if_unedited(object: &mut BaseObject) -> bool {
    unedited(&object.published, &mut object.updated)
}

pub struct TimestampStage;

#[async_trait]
impl Stage for TimestampStage {
    fn name(&self) -> &'static str {
        "timestamps"
    }

    async fn apply(&self, wire: &mut WireObject, ctx: &StageContext<'_>) -> Result<StageOutcome> {
        let mut changed = false;

        if ctx.rendering {
            if let Some(activity) = wire.as_activity_mut() {
                changed |= unedited(&activity.published, &mut activity.updated);
            }
            if let Some(object) = wire.content_object_mut() {
                changed |= clear_if_unedited(object);
            }
        } else if wire.verb() == Some(Verb::Create) {
            if let Some(activity) = wire.as_activity_mut() {
                changed |= activity.updated.take().is_some();
                if let Some(object) = activity.embedded_mut() {
                    changed |= object.updated.take().is_some();
                }
            }
        }

        Ok(if changed {
            StageOutcome::Rewritten
        } else {
            StageOutcome::Unchanged
        })
    }
}
