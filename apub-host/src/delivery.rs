//! Signed delivery to remote inboxes.

use async_trait::async_trait;

use apub_model::OwnerId;

/// Why a POST to a remote inbox failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Request timed out")]
    Timeout,

    /// Remote answered with a non-2xx status
    #[error("Remote returned HTTP {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(String),

    /// The host cannot deliver at all
    #[error("Delivery unavailable")]
    Unavailable,
}

/// The host's signed-POST primitive. Signing and transport belong to the host.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Whether this host can deliver. Redelivery is skipped when it cannot.
    fn is_available(&self) -> bool {
        true
    }

    async fn signed_post(&self, url: &str, body: &str, owner_id: OwnerId) -> Result<(), DeliveryError>;
}

/// Stand-in for hosts without a delivery primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelivery;

#[async_trait]
impl DeliveryClient for NoDelivery {
    fn is_available(&self) -> bool {
        false
    }

    async fn signed_post(&self, _url: &str, _body: &str, _owner_id: OwnerId) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unavailable)
    }
}
