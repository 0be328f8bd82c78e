//! Actor metadata resolution (WebFinger and friends).

use async_trait::async_trait;

use crate::error::Result;

/// Resolves between actor URLs and `user@host` handles.
#[async_trait]
pub trait ActorResolver: Send + Sync {
    /// Actor URL to `acct:user@host` (or bare `user@host`).
    async fn uri_to_acct(&self, actor_url: &str) -> Result<Option<String>>;

    /// `user@host` handle to actor URL.
    async fn resolve(&self, handle: &str) -> Result<Option<String>>;
}

/// Resolver for hosts without WebFinger support; resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActorResolver;

#[async_trait]
impl ActorResolver for NoActorResolver {
    async fn uri_to_acct(&self, _actor_url: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn resolve(&self, _handle: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
