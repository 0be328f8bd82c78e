//! Deferred work handed to the host scheduler.
//!
//! Scheduling is deduplicated on task identity: two tasks are the same task
//! when their hook name and arguments are equal.

use serde::{Deserialize, Serialize};

use crate::activity::Verb;
use crate::content::ContentId;

/// Local user a delivery is signed as.
pub type OwnerId = u64;

/// Federate one content item with one verb.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FederationTask {
    pub content_id: ContentId,
    pub verb: Verb,
}

impl FederationTask {
    pub fn new(content_id: ContentId, verb: Verb) -> Self {
        Self { content_id, verb }
    }
}

/// One logical delivery: the same payload to the same inbox as the same owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryKey {
    /// Remote inbox
    pub url: String,
    /// Request payload, exactly as posted
    pub body: String,
    pub owner_id: OwnerId,
}

impl DeliveryKey {
    pub fn new(url: impl Into<String>, body: impl Into<String>, owner_id: OwnerId) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            owner_id,
        }
    }
}

/// A task the add-on asks the host to run later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "hook", content = "args", rename_all = "snake_case")]
pub enum ScheduledTask {
    Federate(FederationTask),
    ResendPost(DeliveryKey),
}

impl ScheduledTask {
    pub fn hook_name(&self) -> &'static str {
        match self {
            ScheduledTask::Federate(_) => "apub_addon_federate",
            ScheduledTask::ResendPost(_) => "apub_addon_resend_post",
        }
    }
}
