//! Deferred task scheduling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use apub_model::ScheduledTask;

use crate::error::Result;

/// The host's single-event scheduler.
///
/// Task identity is the task value itself, so callers dedupe with
/// [`TaskScheduler::is_scheduled`] before scheduling.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn schedule(&self, task: ScheduledTask, at: DateTime<Utc>) -> Result<()>;

    /// When the task is due, if it is pending.
    async fn next_scheduled(&self, task: &ScheduledTask) -> Result<Option<DateTime<Utc>>>;

    async fn unschedule(&self, task: &ScheduledTask) -> Result<()>;

    async fn is_scheduled(&self, task: &ScheduledTask) -> Result<bool> {
        Ok(self.next_scheduled(task).await?.is_some())
    }
}

/// In-process scheduler. The owner drains due tasks with
/// [`LocalScheduler::take_due`] and runs them.
#[derive(Default)]
pub struct LocalScheduler {
    pending: DashMap<ScheduledTask, DateTime<Utc>>,
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every task due at `now`, earliest first.
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<(ScheduledTask, DateTime<Utc>)> {
        let due_keys: Vec<ScheduledTask> = self
            .pending
            .iter()
            .filter(|entry| *entry.value() <= now)
            .map(|entry| entry.key().clone())
            .collect();

        let mut due: Vec<(ScheduledTask, DateTime<Utc>)> = due_keys
            .into_iter()
            .filter_map(|task| self.pending.remove(&task))
            .collect();
        due.sort_by_key(|(_, at)| *at);
        due
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Snapshot of pending tasks.
    pub fn pending(&self) -> Vec<(ScheduledTask, DateTime<Utc>)> {
        self.pending
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

#[async_trait]
impl TaskScheduler for LocalScheduler {
    async fn schedule(&self, task: ScheduledTask, at: DateTime<Utc>) -> Result<()> {
        debug!(hook = task.hook_name(), at = %at, "Scheduling task");
        self.pending.insert(task, at);
        Ok(())
    }

    async fn next_scheduled(&self, task: &ScheduledTask) -> Result<Option<DateTime<Utc>>> {
        Ok(self.pending.get(task).map(|at| *at))
    }

    async fn unschedule(&self, task: &ScheduledTask) -> Result<()> {
        self.pending.remove(task);
        Ok(())
    }
}
