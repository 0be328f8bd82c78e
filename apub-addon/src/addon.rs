//! Add-on facade - wires host events to the components.
//!
//! The host calls one method per event:
//!
//! | host event | method |
//! |---|---|
//! | item saved | [`Addon::on_saved`] |
//! | REST insert, status changed | [`Addon::record_transition`] |
//! | REST insert committed | [`Addon::settle`] |
//! | payload serialized | [`Addon::transform`] / [`Addon::render`] |
//! | about to POST | [`Addon::filter_send`] |
//! | POST finished | [`Addon::on_delivery_result`] |
//! | building mentions | [`Addon::mentions`] |
//! | inbound Update handled | [`Addon::handled_update`] |
//! | scheduler tick | [`Addon::run_due`] |

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use apub_host::DeliveryError;
use apub_model::{ContentId, ContentStatus, DeliveryKey, FederationTask, ScheduledTask, TargetKind, WireObject};

use crate::capabilities::HostCapabilities;
use crate::config::AddonConfig;
use crate::context::RequestContext;
use crate::error::Result;
use crate::fingerprint::{ChangeHashTracker, FingerprintHook};
use crate::notify::EditNotifier;
use crate::pipeline::{ReplyMentions, TransformPipeline, UnlistedPredicate};
use crate::reconciler::StatusReconciler;
use crate::retry::{RetryOutcome, RetryQueue};
use crate::targets::{CachedFetcher, TargetIndexer};

/// What one [`Addon::run_due`] pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DueReport {
    /// Tasks handed to the host, in run order
    pub federated: Vec<FederationTask>,
    pub resent: Vec<(DeliveryKey, RetryOutcome)>,
    /// Tasks that errored; they are not rescheduled
    pub failed: usize,
}

/// The add-on.
pub struct Addon {
    config: AddonConfig,
    caps: HostCapabilities,
    tracker: ChangeHashTracker,
    reconciler: StatusReconciler,
    pipeline: TransformPipeline,
    retry: RetryQueue,
    targets: TargetIndexer,
    mentions: ReplyMentions,
    notifier: EditNotifier,
}

impl Addon {
    /// Build the add-on. Fails on inconsistent config.
    pub fn new(config: AddonConfig, caps: HostCapabilities) -> Result<Self> {
        config.validate()?;

        let tracker = ChangeHashTracker::new(caps.store.clone(), config.updates.limit_updates);
        let reconciler = StatusReconciler::new(
            caps.store.clone(),
            caps.host.clone(),
            caps.scheduler.clone(),
            caps.clock.clone(),
        );
        let pipeline = TransformPipeline::new(&config, caps.store.clone(), caps.renderer.clone());
        let retry = RetryQueue::new(
            caps.transient.clone(),
            caps.scheduler.clone(),
            caps.delivery.clone(),
            caps.clock.clone(),
            config.retry.clone(),
        );
        let targets = TargetIndexer::new(
            config.replies.clone(),
            caps.store.clone(),
            caps.host.clone(),
            CachedFetcher::new(caps.fetcher.clone(), caps.transient.clone(), &config.fetch),
            caps.actors.clone(),
            caps.renderer.clone(),
            caps.resolver.clone(),
        );
        let mentions = ReplyMentions::new(config.replies.enabled, caps.store.clone());
        let notifier = EditNotifier::new(config.notifications.edit_notifications, caps.notifier.clone());

        info!(
            unlisted = config.unlisted.enabled,
            replies = config.replies.enabled,
            limit_updates = config.updates.limit_updates,
            "Add-on initialized"
        );

        Ok(Self {
            config,
            caps,
            tracker,
            reconciler,
            pipeline,
            retry,
            targets,
            mentions,
            notifier,
        })
    }

    /// Install a custom Update fingerprint.
    pub fn with_fingerprint_hook(mut self, hook: Arc<dyn FingerprintHook>) -> Self {
        self.tracker =
            ChangeHashTracker::new(self.caps.store.clone(), self.config.updates.limit_updates).with_hook(hook);
        self
    }

    /// Install a custom unlisted rule.
    pub fn with_unlisted_predicate(mut self, predicate: Arc<dyn UnlistedPredicate>) -> Self {
        self.pipeline = self.pipeline.with_unlisted_predicate(&self.config, predicate);
        self
    }

    pub fn config(&self) -> &AddonConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &HostCapabilities {
        &self.caps
    }

    /// Item saved directly. Refreshes reply/repost/like targets; the host's
    /// own scheduling stands.
    pub async fn on_saved(&self, id: ContentId) -> Result<Vec<TargetKind>> {
        self.reconciler.on_saved(id);

        match self.caps.store.get_item(id).await? {
            Some(item) => self.targets.index(&item).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn record_transition(
        &self,
        ctx: &mut RequestContext,
        id: ContentId,
        old_status: ContentStatus,
        new_status: ContentStatus,
    ) -> Result<()> {
        self.reconciler.record_transition(ctx, id, old_status, new_status).await
    }

    pub async fn settle(&self, ctx: &mut RequestContext, id: ContentId) -> Result<Option<FederationTask>> {
        self.reconciler.settle(ctx, id).await
    }

    /// Whether a serialized payload should be POSTed at all.
    pub async fn filter_send(&self, wire: &WireObject) -> Result<bool> {
        let Some(object_id) = wire.subject_id() else {
            return Ok(true);
        };

        match self.caps.store.resolve_from_object_id(object_id).await? {
            Some(item) => self.tracker.should_send_update(&item, wire).await,
            None => Ok(true),
        }
    }

    /// Rewrite a payload about to be federated.
    pub async fn transform(&self, wire: WireObject) -> Result<WireObject> {
        self.pipeline.apply_for_object(wire).await
    }

    /// Rewrite a payload about to be served to a remote GET.
    pub async fn render(&self, wire: WireObject) -> Result<WireObject> {
        self.pipeline.render_for_object(wire).await
    }

    pub async fn on_delivery_result(
        &self,
        result: &std::result::Result<(), DeliveryError>,
        key: &DeliveryKey,
    ) -> Result<RetryOutcome> {
        self.retry.on_delivery_result(result, key).await
    }

    /// Add reply mentions for `id` to the host's mention map.
    pub async fn mentions(&self, id: ContentId, mentions: &mut BTreeMap<String, String>) -> Result<()> {
        match self.caps.store.get_item(id).await? {
            Some(item) => self.mentions.extend(&item, mentions).await,
            None => Ok(()),
        }
    }

    pub async fn handled_update(&self, activity: &WireObject, comment_id: Option<ContentId>) -> Result<bool> {
        self.notifier.handled_update(activity, comment_id).await
    }

    /// Run every task due at `now` on the in-process scheduler. Federation
    /// tasks run in schedule order; resends run concurrently.
    pub async fn run_due(&self, now: DateTime<Utc>) -> Result<DueReport> {
        let Some(local) = &self.caps.local_scheduler else {
            debug!("Host runs its own scheduler");
            return Ok(DueReport::default());
        };

        let mut report = DueReport::default();
        let mut resends = Vec::new();

        for (task, _at) in local.take_due(now) {
            match task {
                ScheduledTask::Federate(task) => match self.caps.host.federate(task.content_id, task.verb).await {
                    Ok(()) => report.federated.push(task),
                    Err(e) => {
                        warn!(content_id = task.content_id, verb = %task.verb, error = %e, "Federation task failed");
                        report.failed += 1;
                    }
                },
                ScheduledTask::ResendPost(key) => resends.push(key),
            }
        }

        let outcomes = join_all(resends.iter().map(|key| self.retry.resend(key))).await;
        for (key, outcome) in resends.into_iter().zip(outcomes) {
            match outcome {
                Ok(outcome) => report.resent.push((key, outcome)),
                Err(e) => {
                    warn!(url = %key.url, error = %e, "Resend failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
