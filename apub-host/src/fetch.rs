//! Remote GETs used to check whether a linked URL is Fediverse-compatible.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{HostError, Result};

/// What the add-on keeps of a remote response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RemoteResponse {
    /// Media type without parameters (`application/activity+json`).
    pub fn media_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
    }
}

/// Fetches remote documents.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn get(&self, url: &str, accept: &str) -> Result<RemoteResponse>;
}

/// `reqwest`-backed fetcher with a request timeout and a response size cap.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HostError::Network(e.to_string()))?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn get(&self, url: &str, accept: &str) -> Result<RemoteResponse> {
        debug!(url = %url, accept = %accept, "Fetching remote document");

        let mut response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| HostError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| HostError::Network(e.to_string()))?
        {
            let room = self.max_body_bytes.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= self.max_body_bytes {
                debug!(url = %url, limit = self.max_body_bytes, "Response truncated");
                break;
            }
        }

        Ok(RemoteResponse {
            status,
            content_type,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Fetcher for hosts that forbid outbound requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetcher;

#[async_trait]
impl RemoteFetcher for NoFetcher {
    async fn get(&self, _url: &str, _accept: &str) -> Result<RemoteResponse> {
        Err(HostError::Unavailable("remote fetch"))
    }
}
