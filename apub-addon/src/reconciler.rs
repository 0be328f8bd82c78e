//! Status reconciliation: turn content status changes into exactly one
//! federation task per change.
//!
//! Two write paths reach the add-on:
//!
//! - **Direct save**: the status change is final when the save hook fires and
//!   the host's own scheduler handles it.
//! - **Deferred REST insert**: taxonomy and custom fields land *after* the
//!   status change. The first callback records the transition and holds the
//!   host's scheduler back; the settle callback, fired once the write is
//!   committed, derives the verb and schedules the task.

use std::sync::Arc;
use tracing::{debug, info};

use apub_host::{Clock, ContentStore, FederationHost, TaskScheduler};
use apub_model::{ContentId, ContentStatus, FederationTask, ScheduledTask, StatusTransition, Verb};

use crate::context::RequestContext;
use crate::error::Result;

/// Verb for a status change, if it federates at all.
pub fn derive_verb(old: &ContentStatus, new: &ContentStatus) -> Option<Verb> {
    if new.is_trashed() {
        return (!old.is_trashed()).then_some(Verb::Delete);
    }

    if !new.is_published() {
        return None;
    }

    if old.is_published() {
        Some(Verb::Update)
    } else {
        Some(Verb::Create)
    }
}

/// Whether `verb` still agrees with the item's persisted status.
fn agrees_with_status(verb: Verb, status: &ContentStatus) -> bool {
    match verb {
        Verb::Create | Verb::Update => status.is_published(),
        Verb::Delete => !status.is_published(),
        _ => false,
    }
}

/// Derives and schedules federation tasks for status changes.
pub struct StatusReconciler {
    store: Arc<dyn ContentStore>,
    host: Arc<dyn FederationHost>,
    scheduler: Arc<dyn TaskScheduler>,
    clock: Arc<dyn Clock>,
}

impl StatusReconciler {
    pub fn new(
        store: Arc<dyn ContentStore>,
        host: Arc<dyn FederationHost>,
        scheduler: Arc<dyn TaskScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            host,
            scheduler,
            clock,
        }
    }

    /// Direct-save path. The host's default scheduling stands.
    pub fn on_saved(&self, id: ContentId) {
        debug!(content_id = id, "Direct save, deferring to host scheduling");
    }

    /// First callback of a deferred write: remember the transition and keep
    /// the host from federating before taxonomy has settled.
    pub async fn record_transition(
        &self,
        ctx: &mut RequestContext,
        id: ContentId,
        old_status: ContentStatus,
        new_status: ContentStatus,
    ) -> Result<()> {
        debug!(
            request_id = %ctx.request_id(),
            content_id = id,
            old = %old_status,
            new = %new_status,
            "Recording status transition"
        );

        ctx.record(StatusTransition::new(id, old_status, new_status));
        self.host.suspend_default_scheduling(id).await?;
        Ok(())
    }

    /// Settle callback of a deferred write. Returns the task scheduled, if any.
    pub async fn settle(&self, ctx: &mut RequestContext, id: ContentId) -> Result<Option<FederationTask>> {
        let Some(transition) = ctx.take(id) else {
            debug!(content_id = id, "No recorded transition to settle");
            return Ok(None);
        };

        let Some(verb) = derive_verb(&transition.old_status, &transition.new_status) else {
            debug!(
                content_id = id,
                old = %transition.old_status,
                new = %transition.new_status,
                "Transition does not federate"
            );
            return Ok(None);
        };

        let Some(item) = self.store.get_item(id).await? else {
            debug!(content_id = id, "Item vanished before settling");
            return Ok(None);
        };

        if !agrees_with_status(verb, &item.status) {
            debug!(content_id = id, verb = %verb, status = %item.status, "Status moved on, skipping");
            return Ok(None);
        }

        if item.is_password_protected() {
            debug!(content_id = id, "Password protected, not federating");
            return Ok(None);
        }

        if !self.host.supports_type(&item.content_type) {
            debug!(content_id = id, content_type = %item.content_type, "Unsupported content type");
            return Ok(None);
        }

        let task = FederationTask::new(id, verb);
        let scheduled = ScheduledTask::Federate(task.clone());
        if self.scheduler.is_scheduled(&scheduled).await? {
            debug!(content_id = id, verb = %verb, "Task already pending");
            return Ok(None);
        }

        self.scheduler.schedule(scheduled, self.clock.now()).await?;
        info!(content_id = id, verb = %verb, "Scheduled federation");
        Ok(Some(task))
    }
}
