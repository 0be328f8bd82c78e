//! Host rendering and body parsing.
//!
//! Rendering (templating, sanitization) and microformat parsing stay with the
//! host; the add-on only consumes their output.

use apub_model::{ContentItem, TargetKind};

/// Renders content the way the host would.
pub trait ContentRenderer: Send + Sync {
    /// The item body after the host's display filters.
    fn render(&self, item: &ContentItem) -> String;

    /// Federated `content` for `item`, generated from `fragment` instead of
    /// the full body.
    fn render_federated(&self, item: &ContentItem, fragment: &str) -> String;
}

/// Renderer that passes bodies through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl ContentRenderer for PlainRenderer {
    fn render(&self, item: &ContentItem) -> String {
        item.body.clone()
    }

    fn render_federated(&self, _item: &ContentItem, fragment: &str) -> String {
        fragment.to_string()
    }
}

/// A reply, repost or like target found in a post body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyCandidate {
    pub url: String,
    /// Best-effort author, e.g. `@alice@remote.example`
    pub author: Option<String>,
}

impl ReplyCandidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            author: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Extracts target candidates from a rendered body.
pub trait ReplyResolver: Send + Sync {
    fn candidate(&self, rendered_body: &str, kind: TargetKind) -> Option<ReplyCandidate>;
}

/// Resolver for hosts without a microformats parser; finds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReplyResolver;

impl ReplyResolver for NoReplyResolver {
    fn candidate(&self, _rendered_body: &str, _kind: TargetKind) -> Option<ReplyCandidate> {
        None
    }
}
