//! Reply, repost and like targets.
//!
//! On save, each target the host's body parser finds is checked for
//! Fediverse compatibility and stored as a URL plus the account to mention.
//! Targets that don't check out leave no metadata behind, so a post that
//! merely links somewhere federates as an ordinary post.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use apub_host::{
    ActorResolver, ContentRenderer, ContentStore, FederationHost, RemoteFetcher, RemoteResponse, ReplyCandidate,
    ReplyResolver, TransientStore,
};
use apub_model::{ActorMention, ContentItem, ContentKind, TargetKind};

use crate::config::{FetchConfig, RepliesConfig};
use crate::error::Result;
use crate::fingerprint::compute_hash;

const ACTIVITY_JSON: &str = "application/activity+json";

/// Media types that suggest an ActivityPub object came back.
const JSON_TYPES: [&str; 3] = ["application/json", ACTIVITY_JSON, "application/ld+json"];

/// `@user@host`, capturing `user@host`.
const HANDLE_PATTERN: &str = r"^@([^@\s]+@[^@\s]+\.[^@\s]+)$";

/// Remote GETs, cached in the transient store.
pub struct CachedFetcher {
    fetcher: Arc<dyn RemoteFetcher>,
    transient: Arc<dyn TransientStore>,
    ttl: chrono::Duration,
}

impl CachedFetcher {
    pub fn new(fetcher: Arc<dyn RemoteFetcher>, transient: Arc<dyn TransientStore>, config: &FetchConfig) -> Self {
        Self {
            fetcher,
            transient,
            ttl: config.cache_ttl(),
        }
    }

    fn cache_key(url: &str) -> String {
        format!("remote_get:{}", compute_hash(url.as_bytes()))
    }

    /// GET `url`, serving a cached response when one is still live. Failed
    /// requests are not cached.
    pub async fn get(&self, url: &str, accept: &str) -> Result<RemoteResponse> {
        let key = Self::cache_key(url);
        if let Some(cached) = self.transient.get(&key).await? {
            if let Ok(response) = serde_json::from_value::<RemoteResponse>(cached) {
                debug!(url = %url, "Remote response cache hit");
                return Ok(response);
            }
        }

        let response = self.fetcher.get(url, accept).await?;
        self.transient
            .set(&key, serde_json::to_value(&response)?, self.ttl)
            .await?;
        Ok(response)
    }
}

/// Where a candidate target ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// A remote post and the account behind it
    Remote { url: String, actor: ActorMention },
    /// One of our own items
    Local { url: String },
}

/// Finds an actor URL or handle for a fetched remote object.
fn inspect(url: &Url, response: &RemoteResponse, author: Option<&str>) -> (Option<String>, Option<String>) {
    let is_json = response.media_type().is_some_and(|ct| JSON_TYPES.contains(&ct));
    if !is_json {
        return (None, None);
    }

    let attributed_to = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|json| json.get("attributedTo").and_then(Value::as_str).map(str::to_string))
        .filter(|actor| !actor.is_empty());
    if let Some(actor_url) = attributed_to {
        return (Some(actor_url), None);
    }

    // Author fields that look like a Fediverse handle.
    let handle = author.and_then(|author| {
        let pattern = Regex::new(HANDLE_PATTERN).ok()?;
        pattern.captures(author).map(|caps| caps[1].to_string())
    });
    if handle.is_some() {
        return (None, handle);
    }

    // Servers with authorized fetch still answer with JSON, just not the
    // object. Mastodon-style `/@user/...` paths give the actor away.
    let first_segment = url.path().trim_start_matches('/').split('/').next().unwrap_or_default();
    if first_segment.starts_with('@') && first_segment.len() > 1 {
        if let Some(host) = url.host_str() {
            let authority = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            return (Some(format!("{}://{}/{}", url.scheme(), authority, first_segment)), None);
        }
    }

    (None, None)
}

/// Stores Fediverse-compatible targets for saved posts.
pub struct TargetIndexer {
    config: RepliesConfig,
    store: Arc<dyn ContentStore>,
    host: Arc<dyn FederationHost>,
    fetcher: CachedFetcher,
    actors: Arc<dyn ActorResolver>,
    renderer: Arc<dyn ContentRenderer>,
    resolver: Arc<dyn ReplyResolver>,
}

impl TargetIndexer {
    pub fn new(
        config: RepliesConfig,
        store: Arc<dyn ContentStore>,
        host: Arc<dyn FederationHost>,
        fetcher: CachedFetcher,
        actors: Arc<dyn ActorResolver>,
        renderer: Arc<dyn ContentRenderer>,
        resolver: Arc<dyn ReplyResolver>,
    ) -> Self {
        Self {
            config,
            store,
            host,
            fetcher,
            actors,
            renderer,
            resolver,
        }
    }

    /// Refresh target metadata for a saved item. Returns the kinds stored.
    pub async fn index(&self, item: &ContentItem) -> Result<Vec<TargetKind>> {
        if !self.config.enabled {
            debug!(content_id = item.id, "Replies disabled");
            return Ok(Vec::new());
        }

        if item.kind != ContentKind::Post || !self.host.supports_type(&item.content_type) {
            debug!(content_id = item.id, content_type = %item.content_type, "Unsupported content type");
            return Ok(Vec::new());
        }

        if item.body.trim().is_empty() {
            debug!(content_id = item.id, "Empty body, nothing to index");
            return Ok(Vec::new());
        }

        let rendered = self.renderer.render(item);
        let mut stored = Vec::new();

        for kind in TargetKind::ALL {
            let resolved = match self.resolver.candidate(&rendered, kind) {
                Some(candidate) => self.resolve(&candidate).await?,
                None => None,
            };

            match resolved {
                Some(ResolvedTarget::Remote { url, actor }) => {
                    self.store.set_meta(item.id, kind.url_key(), json!(url)).await?;
                    self.store
                        .set_meta(item.id, kind.actor_key(), json!({ actor.handle: actor.actor_url }))
                        .await?;
                    stored.push(kind);
                }
                Some(ResolvedTarget::Local { url }) => {
                    self.store.set_meta(item.id, kind.url_key(), json!(url)).await?;
                    self.store.delete_meta(item.id, kind.actor_key()).await?;
                    stored.push(kind);
                }
                None => {
                    self.store.delete_meta(item.id, kind.url_key()).await?;
                    self.store.delete_meta(item.id, kind.actor_key()).await?;
                }
            }
        }

        debug!(content_id = item.id, targets = ?stored, "Indexed targets");
        Ok(stored)
    }

    /// Check one candidate. Anything that can't be confirmed yields `None`.
    pub async fn resolve(&self, candidate: &ReplyCandidate) -> Result<Option<ResolvedTarget>> {
        let url = match Url::parse(&candidate.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => url,
            _ => {
                debug!(url = %candidate.url, "Not a usable target URL");
                return Ok(None);
            }
        };

        if self.config.thread_to_self {
            if let Some(local) = self.store.resolve_from_object_id(&candidate.url).await? {
                debug!(url = %candidate.url, content_id = local.id, "Target is a local item");
                return Ok(Some(ResolvedTarget::Local {
                    url: local.federated_id,
                }));
            }
        }

        let response = match self.fetcher.get(url.as_str(), ACTIVITY_JSON).await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %candidate.url, error = %e, "Target fetch failed");
                return Ok(None);
            }
        };

        let (mut actor_url, mut handle) = inspect(&url, &response, candidate.author.as_deref());

        if handle.is_none() {
            if let Some(actor) = actor_url.as_deref() {
                handle = match self.actors.uri_to_acct(actor).await {
                    Ok(acct) => acct.map(|acct| acct.strip_prefix("acct:").map(str::to_string).unwrap_or(acct)),
                    Err(e) => {
                        debug!(url = %candidate.url, actor = %actor, error = %e, "Actor lookup failed");
                        return Ok(None);
                    }
                };
            }
        } else if actor_url.is_none() {
            if let Some(h) = handle.as_deref() {
                actor_url = match self.actors.resolve(h).await {
                    Ok(actor_url) => actor_url,
                    Err(e) => {
                        debug!(url = %candidate.url, handle = %h, error = %e, "Handle lookup failed");
                        return Ok(None);
                    }
                };
            }
        }

        match (actor_url, handle) {
            (Some(actor_url), Some(handle)) if !actor_url.is_empty() && !handle.is_empty() => {
                Ok(Some(ResolvedTarget::Remote {
                    url: candidate.url.clone(),
                    actor: ActorMention::new(handle, actor_url),
                }))
            }
            _ => {
                debug!(url = %candidate.url, "No Fediverse account behind target");
                Ok(None)
            }
        }
    }
}
