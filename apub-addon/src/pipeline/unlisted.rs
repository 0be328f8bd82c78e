//! Unlisted addressing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use apub_model::{Audience, ContentItem, ContentKind, WireObject, PUBLIC_AUDIENCE};

use super::{Stage, StageContext, StageOutcome};
use crate::config::UnlistedConfig;
use crate::error::Result;

/// Overrides the category/comment rule, e.g. to unlist certain post formats.
pub trait UnlistedPredicate: Send + Sync {
    /// `default` is the configured rule's verdict.
    fn is_unlisted(&self, item: &ContentItem, default: bool) -> bool;
}

/// Keep the first occurrence of every entry.
fn dedupe(list: &mut Vec<String>) {
    let mut seen = HashSet::new();
    list.retain(|entry| seen.insert(entry.clone()));
}

/// Address `target` as unlisted: public marker out of `to`, exactly once in `cc`.
pub fn make_unlisted<A: Audience + ?Sized>(target: &mut A) {
    target.to_mut().retain(|r| r != PUBLIC_AUDIENCE);
    dedupe(target.to_mut());

    let cc = target.cc_mut();
    cc.push(PUBLIC_AUDIENCE.to_string());
    dedupe(cc);
}

pub struct UnlistedStage {
    config: UnlistedConfig,
    predicate: Option<Arc<dyn UnlistedPredicate>>,
}

impl UnlistedStage {
    pub const NAME: &'static str = "unlisted";

    pub fn new(config: UnlistedConfig) -> Self {
        Self {
            config,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Arc<dyn UnlistedPredicate>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    fn is_unlisted(&self, item: &ContentItem) -> bool {
        let default = match item.kind {
            ContentKind::Post => self.config.categories.iter().any(|slug| item.in_category(slug)),
            ContentKind::Comment => self.config.comments,
        };

        match &self.predicate {
            Some(predicate) => predicate.is_unlisted(item, default),
            None => default,
        }
    }
}

#[async_trait]
impl Stage for UnlistedStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn apply(&self, wire: &mut WireObject, ctx: &StageContext<'_>) -> Result<StageOutcome> {
        if !self.config.enabled || !self.is_unlisted(ctx.item) {
            return Ok(StageOutcome::Unchanged);
        }

        make_unlisted(wire);
        wire.mirror_audience();
        Ok(StageOutcome::Rewritten)
    }
}
