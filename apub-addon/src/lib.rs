//! ActivityPub Add-on - federation policy for a host's outgoing activities
//!
//! Sits next to an ActivityPub federation host and decides whether, when and
//! in what shape local content changes go out:
//! - Suppresses Updates that change nothing a remote server would see
//! - Federates REST-inserted content once, after taxonomy has settled
//! - Rewrites payloads (unlisted addressing, reply threading, reposts, likes)
//! - Retries failed inbox deliveries with bounded attempts
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                    Addon                     │
//! │        (one method per host event)           │
//! └──────┬──────────┬───────────┬───────────┬────┘
//!        ▼          ▼           ▼           ▼
//! ┌───────────┐┌──────────┐┌──────────┐┌──────────┐
//! │ Status    ││Transform ││ Change-  ││ Retry    │
//! │ Reconciler││Pipeline  ││ Hash     ││ Queue    │
//! │           ││          ││ Tracker  ││          │
//! └───────────┘└──────────┘└──────────┘└──────────┘
//!        │          │           │           │
//!        └──────────┴─────┬─────┴───────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  HostCapabilities   │
//!              │  (apub-host traits) │
//!              └─────────────────────┘
//! ```

pub mod addon;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod notify;
pub mod pipeline;
pub mod reconciler;
pub mod retry;
pub mod targets;

// Re-export main types for convenience
pub use addon::{Addon, DueReport};
pub use capabilities::HostCapabilities;
pub use config::{
    AddonConfig, FetchConfig, NotificationsConfig, RepliesConfig, RetryConfig, UnlistedConfig, UpdatesConfig,
};
pub use context::RequestContext;
pub use error::{AddonError, Result};
pub use fingerprint::{compute_fingerprint, ChangeHashTracker, FingerprintHook};
pub use notify::EditNotifier;
pub use pipeline::{ReplyMentions, Stage, StageContext, StageOutcome, TransformPipeline, UnlistedPredicate};
pub use reconciler::{derive_verb, StatusReconciler};
pub use retry::{retry_key, RetryOutcome, RetryQueue, RetryRecord};
pub use targets::{CachedFetcher, ResolvedTarget, TargetIndexer};
