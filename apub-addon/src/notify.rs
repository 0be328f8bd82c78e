//! Moderator notifications for edited remote comments.

use std::sync::Arc;
use tracing::{debug, info};

use apub_host::ModeratorNotifier;
use apub_model::{ContentId, Verb, WireObject};

use crate::error::Result;

pub struct EditNotifier {
    enabled: bool,
    notifier: Arc<dyn ModeratorNotifier>,
}

impl EditNotifier {
    pub fn new(enabled: bool, notifier: Arc<dyn ModeratorNotifier>) -> Self {
        Self { enabled, notifier }
    }

    /// Called after the host handled an inbound `Update`. `comment_id` is the
    /// local comment it changed, if any. Returns whether a moderator was
    /// notified.
    pub async fn handled_update(&self, activity: &WireObject, comment_id: Option<ContentId>) -> Result<bool> {
        if !self.enabled || activity.verb() != Some(Verb::Update) {
            return Ok(false);
        }

        let Some(comment_id) = comment_id else {
            debug!("Update touched no local comment");
            return Ok(false);
        };

        self.notifier.notify_moderator(comment_id).await?;
        info!(comment_id, "Notified moderator of edited comment");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apub_model::{Activity, BaseObject};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Inbox(Mutex<Vec<ContentId>>);

    #[async_trait]
    impl ModeratorNotifier for Inbox {
        async fn notify_moderator(&self, comment_id: ContentId) -> apub_host::Result<()> {
            self.0.lock().unwrap().push(comment_id);
            Ok(())
        }
    }

    fn inbound(verb: Verb) -> WireObject {
        let object = BaseObject::new("Note").with_id("https://remote.example/notes/1");
        WireObject::Activity(Activity::wrap(verb, "https://remote.example/users/alice", object))
    }

    #[tokio::test]
    async fn test_edit_notifies_moderator() {
        let inbox = Arc::new(Inbox::default());
        let notifier = EditNotifier::new(true, inbox.clone());

        assert!(notifier.handled_update(&inbound(Verb::Update), Some(17)).await.unwrap());
        assert!(!notifier.handled_update(&inbound(Verb::Update), None).await.unwrap());
        assert!(!notifier.handled_update(&inbound(Verb::Create), Some(18)).await.unwrap());
        assert_eq!(*inbox.0.lock().unwrap(), vec![17]);
    }

    #[tokio::test]
    async fn test_disabled_notifier_stays_quiet() {
        let inbox = Arc::new(Inbox::default());
        let notifier = EditNotifier::new(false, inbox.clone());

        assert!(!notifier.handled_update(&inbound(Verb::Update), Some(17)).await.unwrap());
        assert!(inbox.0.lock().unwrap().is_empty());
    }
}
