//! Retries for failed inbox deliveries.
//!
//! A failed POST leaves a countdown record in the transient store and a
//! `ResendPost` task in the scheduler. Each resend spends one attempt before
//! posting, and its result is fed back through the same path, so a failure
//! after the last attempt finds an empty countdown and gives up.
//!
//! Records are keyed on the full delivery (inbox, exact payload and signing
//! owner); the same payload to two inboxes retries independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use apub_host::{Clock, DeliveryClient, DeliveryError, TaskScheduler, TransientStore};
use apub_model::{DeliveryKey, OwnerId, ScheduledTask};

use crate::config::RetryConfig;
use crate::error::Result;
use crate::fingerprint::compute_hash;

/// Transient-store key for a delivery's countdown.
pub fn retry_key(key: &DeliveryKey) -> String {
    let digest = compute_hash(format!("url:{};body:{};owner:{}", key.url, key.body, key.owner_id).as_bytes());
    format!("retries:{digest}")
}

/// Countdown for one failing delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryRecord {
    pub destination: String,
    pub payload_hash: String,
    pub owner_id: OwnerId,
    pub remaining_attempts: u32,
    #[serde(default)]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl RetryRecord {
    fn new(key: &DeliveryKey, remaining_attempts: u32) -> Self {
        Self {
            destination: key.url.clone(),
            payload_hash: compute_hash(key.body.as_bytes()),
            owner_id: key.owner_id,
            remaining_attempts,
            next_attempt_at: None,
        }
    }
}

/// What a delivery report or resend did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Delivered; any countdown is gone
    Cleared,
    /// A resend was scheduled
    Scheduled { remaining: u32, at: DateTime<Utc> },
    /// A resend was already pending
    AlreadyScheduled { remaining: u32 },
    /// Out of attempts; the delivery is dropped
    Exhausted,
    /// Nothing to resend: the countdown expired or was cleared
    NoRecord,
    /// No delivery capability; resends are inert
    Unavailable,
}

/// Bounded, deduplicated redelivery of failed POSTs.
pub struct RetryQueue {
    transient: Arc<dyn TransientStore>,
    scheduler: Arc<dyn TaskScheduler>,
    delivery: Arc<dyn DeliveryClient>,
    clock: Arc<dyn Clock>,
    config: RetryConfig,
}

impl RetryQueue {
    pub fn new(
        transient: Arc<dyn TransientStore>,
        scheduler: Arc<dyn TaskScheduler>,
        delivery: Arc<dyn DeliveryClient>,
        clock: Arc<dyn Clock>,
        config: RetryConfig,
    ) -> Self {
        Self {
            transient,
            scheduler,
            delivery,
            clock,
            config,
        }
    }

    /// Load the countdown for a delivery.
    pub async fn record(&self, key: &DeliveryKey) -> Result<Option<RetryRecord>> {
        match self.transient.get(&retry_key(key)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &DeliveryKey, record: &RetryRecord) -> Result<()> {
        // Untouched countdowns keep the short lifetime.
        let ttl = if record.remaining_attempts >= self.config.max_attempts {
            self.config.record_ttl()
        } else {
            self.config.refresh_ttl()
        };
        self.transient
            .set(&retry_key(key), serde_json::to_value(record)?, ttl)
            .await?;
        Ok(())
    }

    /// Handle the result of a POST to a remote inbox.
    pub async fn on_delivery_result(
        &self,
        result: &std::result::Result<(), DeliveryError>,
        key: &DeliveryKey,
    ) -> Result<RetryOutcome> {
        if result.is_ok() {
            self.transient.delete(&retry_key(key)).await?;
            return Ok(RetryOutcome::Cleared);
        }

        let mut record = match self.record(key).await? {
            Some(record) => record,
            None => RetryRecord::new(key, self.config.max_attempts),
        };

        if record.remaining_attempts == 0 {
            self.transient.delete(&retry_key(key)).await?;
            self.scheduler
                .unschedule(&ScheduledTask::ResendPost(key.clone()))
                .await?;
            warn!(url = %key.url, owner_id = key.owner_id, "Delivery failed, out of retries");
            return Ok(RetryOutcome::Exhausted);
        }

        let task = ScheduledTask::ResendPost(key.clone());
        if self.scheduler.is_scheduled(&task).await? {
            debug!(url = %key.url, "Resend already pending");
            return Ok(RetryOutcome::AlreadyScheduled {
                remaining: record.remaining_attempts,
            });
        }

        let at = self.clock.now() + self.config.retry_delay();
        record.next_attempt_at = Some(at);
        self.save(key, &record).await?;
        self.scheduler.schedule(task, at).await?;

        info!(
            url = %key.url,
            remaining = record.remaining_attempts,
            at = %at,
            "Scheduled delivery retry"
        );
        Ok(RetryOutcome::Scheduled {
            remaining: record.remaining_attempts,
            at,
        })
    }

    /// Run one scheduled resend.
    pub async fn resend(&self, key: &DeliveryKey) -> Result<RetryOutcome> {
        if !self.delivery.is_available() {
            debug!(url = %key.url, "No delivery client, skipping resend");
            return Ok(RetryOutcome::Unavailable);
        }

        let Some(mut record) = self.record(key).await? else {
            debug!(url = %key.url, "No retry record, skipping resend");
            return Ok(RetryOutcome::NoRecord);
        };

        if record.remaining_attempts == 0 {
            self.transient.delete(&retry_key(key)).await?;
            return Ok(RetryOutcome::Exhausted);
        }

        record.remaining_attempts -= 1;
        record.next_attempt_at = None;
        self.save(key, &record).await?;

        let result = self.delivery.signed_post(&key.url, &key.body, key.owner_id).await;
        if let Err(e) = &result {
            debug!(url = %key.url, error = %e, remaining = record.remaining_attempts, "Resend failed");
        }

        self.on_delivery_result(&result, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apub_host::{LocalScheduler, ManualClock, MemoryTransientStore, NoDelivery};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` posts, then succeeds.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DeliveryClient for Flaky {
        async fn signed_post(
            &self,
            _url: &str,
            _body: &str,
            _owner_id: OwnerId,
        ) -> std::result::Result<(), DeliveryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(DeliveryError::Status(503))
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        transient: Arc<MemoryTransientStore>,
        scheduler: Arc<LocalScheduler>,
        queue: RetryQueue,
    }

    fn fixture(delivery: Arc<dyn DeliveryClient>) -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
        let transient = Arc::new(MemoryTransientStore::with_clock(clock.clone()));
        let scheduler = Arc::new(LocalScheduler::new());
        let queue = RetryQueue::new(
            transient.clone(),
            scheduler.clone(),
            delivery,
            clock.clone(),
            RetryConfig::default(),
        );
        Fixture {
            clock,
            transient,
            scheduler,
            queue,
        }
    }

    fn key() -> DeliveryKey {
        DeliveryKey::new("https://remote.example/inbox", r#"{"type":"Create"}"#, 1)
    }

    fn failed() -> std::result::Result<(), DeliveryError> {
        Err(DeliveryError::Timeout)
    }

    #[test]
    fn test_retry_key_separates_deliveries() {
        let a = key();
        let b = DeliveryKey::new("https://other.example/inbox", a.body.clone(), 1);
        let c = DeliveryKey::new(a.url.clone(), a.body.clone(), 2);

        assert!(retry_key(&a).starts_with("retries:"));
        assert_eq!(retry_key(&a), retry_key(&key()));
        assert_ne!(retry_key(&a), retry_key(&b));
        assert_ne!(retry_key(&a), retry_key(&c));
    }

    #[tokio::test]
    async fn test_first_failure_schedules_one_resend() {
        let f = fixture(Arc::new(Flaky::new(0)));
        let outcome = f.queue.on_delivery_result(&failed(), &key()).await.unwrap();

        let at = f.clock.now() + chrono::Duration::seconds(120);
        assert_eq!(outcome, RetryOutcome::Scheduled { remaining: 3, at });

        // Duplicate report is absorbed.
        let again = f.queue.on_delivery_result(&failed(), &key()).await.unwrap();
        assert_eq!(again, RetryOutcome::AlreadyScheduled { remaining: 3 });
        assert_eq!(f.scheduler.len(), 1);

        let record = f.queue.record(&key()).await.unwrap().unwrap();
        assert_eq!(record.remaining_attempts, 3);
        assert_eq!(record.destination, "https://remote.example/inbox");
        assert_eq!(record.next_attempt_at, Some(at));
    }

    #[tokio::test]
    async fn test_success_clears_record() {
        let f = fixture(Arc::new(Flaky::new(0)));
        f.queue.on_delivery_result(&failed(), &key()).await.unwrap();

        let outcome = f.queue.on_delivery_result(&Ok(()), &key()).await.unwrap();
        assert_eq!(outcome, RetryOutcome::Cleared);
        assert!(f.transient.is_empty());
    }

    #[tokio::test]
    async fn test_resend_success_clears_record() {
        let flaky = Arc::new(Flaky::new(0));
        let f = fixture(flaky.clone());
        f.queue.on_delivery_result(&failed(), &key()).await.unwrap();

        f.clock.advance(chrono::Duration::seconds(120));
        f.scheduler.take_due(f.clock.now());
        assert_eq!(f.queue.resend(&key()).await.unwrap(), RetryOutcome::Cleared);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
        assert!(f.queue.record(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_three_retries_then_give_up() {
        let flaky = Arc::new(Flaky::new(usize::MAX));
        let f = fixture(flaky.clone());
        f.queue.on_delivery_result(&failed(), &key()).await.unwrap();

        for remaining in [2, 1] {
            f.clock.advance(chrono::Duration::seconds(120));
            assert_eq!(f.scheduler.take_due(f.clock.now()).len(), 1);
            let outcome = f.queue.resend(&key()).await.unwrap();
            assert!(matches!(outcome, RetryOutcome::Scheduled { remaining: r, .. } if r == remaining));
        }

        f.clock.advance(chrono::Duration::seconds(120));
        assert_eq!(f.scheduler.take_due(f.clock.now()).len(), 1);
        assert_eq!(f.queue.resend(&key()).await.unwrap(), RetryOutcome::Exhausted);

        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert!(f.scheduler.is_empty());
        assert!(f.queue.record(&key()).await.unwrap().is_none());

        // A later failure starts over with the full count.
        let fresh = f.queue.on_delivery_result(&failed(), &key()).await.unwrap();
        assert!(matches!(fresh, RetryOutcome::Scheduled { remaining: 3, .. }));
    }

    #[tokio::test]
    async fn test_expired_record_is_not_resent() {
        let flaky = Arc::new(Flaky::new(0));
        let f = fixture(flaky.clone());
        f.queue.on_delivery_result(&failed(), &key()).await.unwrap();

        f.clock.advance(chrono::Duration::hours(2));
        assert_eq!(f.queue.resend(&key()).await.unwrap(), RetryOutcome::NoRecord);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resend_without_delivery_client_is_inert() {
        let f = fixture(Arc::new(NoDelivery));
        f.queue.on_delivery_result(&failed(), &key()).await.unwrap();

        assert_eq!(f.queue.resend(&key()).await.unwrap(), RetryOutcome::Unavailable);
        let record = f.queue.record(&key()).await.unwrap().unwrap();
        assert_eq!(record.remaining_attempts, 3);
    }
}
