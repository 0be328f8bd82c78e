//! Configuration for the add-on.
//!
//! Every feature defaults to off, matching a fresh install; timing constants
//! default to the values remote servers have been seen to tolerate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use apub_host::HttpFetcher;

use crate::error::{AddonError, Result};

/// Top-level add-on configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddonConfig {
    /// "Unlisted" addressing
    pub unlisted: UnlistedConfig,
    /// Reply, repost and like posts
    pub replies: RepliesConfig,
    /// Update suppression
    pub updates: UpdatesConfig,
    /// Failed delivery retries
    pub retry: RetryConfig,
    /// Remote GETs for target checks
    pub fetch: FetchConfig,
    /// Moderator notifications
    pub notifications: NotificationsConfig,
}

impl AddonConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry.retry_delay_secs == 0 {
            return Err(AddonError::Config("retry.retry_delay_secs must be positive".to_string()));
        }

        // A countdown that expires before its next retry fires can never resume.
        if self.retry.record_ttl_secs <= self.retry.retry_delay_secs {
            return Err(AddonError::Config(
                "retry.record_ttl_secs must exceed retry.retry_delay_secs".to_string(),
            ));
        }

        if self.fetch.max_body_bytes == 0 {
            return Err(AddonError::Config("fetch.max_body_bytes must be positive".to_string()));
        }

        if self.unlisted.enabled && self.unlisted.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(AddonError::Config("unlisted.categories contains an empty slug".to_string()));
        }

        Ok(())
    }
}

/// Unlisted addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlistedConfig {
    /// Rewrite matching posts as unlisted
    pub enabled: bool,
    /// Category slugs that mark a post unlisted
    pub categories: Vec<String>,
    /// Unlist every comment
    pub comments: bool,
}

impl Default for UnlistedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            categories: vec!["rss-club".to_string()],
            comments: false,
        }
    }
}

/// Reply posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepliesConfig {
    /// Federate replies to any Fediverse post, plus reposts and likes
    pub enabled: bool,
    /// Thread replies to our own posts onto the local post they answer
    pub thread_to_self: bool,
}

/// Update suppression.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesConfig {
    /// Only federate Updates that change federated fields
    pub limit_updates: bool,
}

/// Delivery retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first failure
    pub max_attempts: u32,
    /// Delay before each retry (seconds)
    pub retry_delay_secs: u64,
    /// Lifetime of a fresh countdown (seconds)
    pub record_ttl_secs: u64,
    /// Lifetime of a countdown after a retry ran (seconds)
    pub refresh_ttl_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 120,
            record_ttl_secs: 3600,   // 1 hour
            refresh_ttl_secs: 86_400, // 1 day
        }
    }
}

impl RetryConfig {
    pub fn retry_delay(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retry_delay_secs as i64)
    }

    pub fn record_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.record_ttl_secs as i64)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_ttl_secs as i64)
    }
}

/// Remote fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout (seconds)
    pub timeout_secs: u64,
    /// Response size cap
    pub max_body_bytes: usize,
    /// How long responses are cached (seconds)
    pub cache_ttl_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 11,
            max_body_bytes: 1_048_576,
            cache_ttl_secs: 300,
        }
    }
}

impl FetchConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }

    /// Build the HTTP fetcher these settings describe.
    pub fn http_fetcher(&self) -> Result<HttpFetcher> {
        Ok(HttpFetcher::new(
            Duration::from_secs(self.timeout_secs),
            self.max_body_bytes,
        )?)
    }
}

/// Moderator notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Notify a moderator when a remote comment gets edited
    pub edit_notifications: bool,
}
