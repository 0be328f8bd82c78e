//! Shared model for the ActivityPub add-on.
//!
//! - **Activities**: the wire representation produced by the federation host,
//!   as a tagged [`WireObject`] (wrapping activity vs. bare base object)
//! - **Content**: local posts and comments as seen by the add-on
//! - **Metadata**: per-item keys the add-on persists through the host
//! - **Tasks**: identities of deferred work handed to the host scheduler

pub mod activity;
pub mod content;
pub mod meta;
pub mod task;

// Re-export main types
pub use activity::{Activity, Audience, BaseObject, ObjectRef, Verb, WireObject, PUBLIC_AUDIENCE};
pub use content::{ContentId, ContentItem, ContentKind, ContentStatus, StatusTransition};
pub use meta::{ActorMention, MetaKey, TargetKind};
pub use task::{DeliveryKey, FederationTask, OwnerId, ScheduledTask};
