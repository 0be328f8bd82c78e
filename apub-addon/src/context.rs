//! Request-scoped state.
//!
//! A content write arriving over the REST API fires several callbacks within
//! one request. The first records the status change, a later one consumes it.
//! The [`RequestContext`] carries those records between callbacks and is
//! dropped with the request, so nothing survives into the next one.

use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use apub_model::{ContentId, StatusTransition};

/// State for one logical request.
#[derive(Debug)]
pub struct RequestContext {
    request_id: Uuid,
    transitions: HashMap<ContentId, StatusTransition>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            transitions: HashMap::new(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Record a transition. A second transition for the same item within the
    /// request keeps the first `old_status` and takes the latest `new_status`.
    pub fn record(&mut self, transition: StatusTransition) {
        self.transitions
            .entry(transition.content_id)
            .and_modify(|existing| existing.new_status = transition.new_status.clone())
            .or_insert(transition);
    }

    /// Remove and return the transition recorded for `id`.
    pub fn take(&mut self, id: ContentId) -> Option<StatusTransition> {
        self.transitions.remove(&id)
    }

    pub fn peek(&self, id: ContentId) -> Option<&StatusTransition> {
        self.transitions.get(&id)
    }

    /// Number of recorded, unconsumed transitions.
    pub fn pending(&self) -> usize {
        self.transitions.len()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if !self.transitions.is_empty() {
            let orphaned: Vec<ContentId> = self.transitions.keys().copied().collect();
            debug!(
                request_id = %self.request_id,
                orphaned = ?orphaned,
                "Discarding unsettled status transitions"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apub_model::ContentStatus;

    #[test]
    fn test_record_and_take() {
        let mut ctx = RequestContext::new();
        ctx.record(StatusTransition::new(42, ContentStatus::Draft, ContentStatus::Publish));
        assert_eq!(ctx.pending(), 1);

        let taken = ctx.take(42).unwrap();
        assert_eq!(taken.old_status, ContentStatus::Draft);
        assert!(ctx.take(42).is_none());
        assert_eq!(ctx.pending(), 0);
    }

    #[test]
    fn test_repeated_record_coalesces() {
        let mut ctx = RequestContext::new();
        ctx.record(StatusTransition::new(7, ContentStatus::Draft, ContentStatus::Publish));
        ctx.record(StatusTransition::new(7, ContentStatus::Publish, ContentStatus::Publish));

        let transition = ctx.peek(7).unwrap();
        assert_eq!(transition.old_status, ContentStatus::Draft);
        assert_eq!(transition.new_status, ContentStatus::Publish);
    }

    #[test]
    fn test_contexts_are_isolated() {
        let mut first = RequestContext::new();
        first.record(StatusTransition::new(1, ContentStatus::Draft, ContentStatus::Publish));
        drop(first);

        let mut second = RequestContext::new();
        assert!(second.take(1).is_none());
    }
}
