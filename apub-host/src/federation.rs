//! Federation host lifecycle hooks and moderator notification.

use async_trait::async_trait;

use apub_model::{ContentId, Verb};

use crate::error::Result;

/// The federation host itself.
#[async_trait]
pub trait FederationHost: Send + Sync {
    /// Whether the host federates this content type at all.
    fn supports_type(&self, content_type: &str) -> bool;

    /// Stop the host's own immediate scheduler from handling this item for
    /// the current write; the add-on decides the verb once the write settles.
    async fn suspend_default_scheduling(&self, id: ContentId) -> Result<()>;

    /// Hand an item to the host's outbox with the given verb.
    async fn federate(&self, id: ContentId, verb: Verb) -> Result<()>;
}

/// Notifies a human moderator about remote activity.
#[async_trait]
pub trait ModeratorNotifier: Send + Sync {
    async fn notify_moderator(&self, comment_id: ContentId) -> Result<()>;
}

/// Notifier for hosts without moderation mail.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNotifier;

#[async_trait]
impl ModeratorNotifier for NoNotifier {
    async fn notify_moderator(&self, _comment_id: ContentId) -> Result<()> {
        Ok(())
    }
}
