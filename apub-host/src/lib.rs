//! Host capabilities for the ActivityPub add-on.
//!
//! The add-on never talks to the federation host directly. Everything it
//! needs (content storage, scheduling, signed delivery, actor lookups, remote
//! fetches) is consumed through the traits in this crate, injected at
//! construction. Capabilities a host cannot provide are substituted with the
//! no-op implementations here, which turn the dependent feature inert rather
//! than failing.
//!
//! # Key Components
//!
//! - [`ContentStore`] / [`MemoryContentStore`]: items and per-item metadata
//! - [`TransientStore`] / [`MemoryTransientStore`]: TTL-bounded cache entries
//! - [`TaskScheduler`] / [`LocalScheduler`]: deduplicated deferred tasks
//! - [`DeliveryClient`]: signed POSTs to remote inboxes
//! - [`RemoteFetcher`] / [`HttpFetcher`]: GETs for target compatibility checks

pub mod actors;
pub mod clock;
pub mod delivery;
pub mod error;
pub mod federation;
pub mod fetch;
pub mod render;
pub mod scheduler;
pub mod store;

// Re-export main types
pub use actors::{ActorResolver, NoActorResolver};
pub use clock::{Clock, ManualClock, SystemClock};
pub use delivery::{DeliveryClient, DeliveryError, NoDelivery};
pub use error::{HostError, Result};
pub use federation::{FederationHost, ModeratorNotifier, NoNotifier};
pub use fetch::{HttpFetcher, NoFetcher, RemoteFetcher, RemoteResponse};
pub use render::{ContentRenderer, NoReplyResolver, PlainRenderer, ReplyCandidate, ReplyResolver};
pub use scheduler::{LocalScheduler, TaskScheduler};
pub use store::{ContentStore, MemoryContentStore, MemoryTransientStore, TransientStore};
