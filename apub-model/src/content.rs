//! Local content as seen by the add-on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-assigned content identifier.
pub type ContentId = u64;

/// Whether an item is a top-level post or a comment on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Comment,
}

/// Publication status of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentStatus {
    Draft,
    Pending,
    Private,
    Future,
    Publish,
    Trash,
    /// Any status the add-on has no rule for (`auto-draft`, `inherit`, ...)
    Other(String),
}

impl ContentStatus {
    pub fn is_published(&self) -> bool {
        matches!(self, ContentStatus::Publish)
    }

    pub fn is_trashed(&self) -> bool {
        matches!(self, ContentStatus::Trash)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Pending => "pending",
            ContentStatus::Private => "private",
            ContentStatus::Future => "future",
            ContentStatus::Publish => "publish",
            ContentStatus::Trash => "trash",
            ContentStatus::Other(other) => other,
        }
    }
}

impl From<&str> for ContentStatus {
    fn from(value: &str) -> Self {
        match value {
            "draft" => ContentStatus::Draft,
            "pending" => ContentStatus::Pending,
            "private" => ContentStatus::Private,
            "future" => ContentStatus::Future,
            "publish" => ContentStatus::Publish,
            "trash" => ContentStatus::Trash,
            other => ContentStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for ContentStatus {
    fn from(value: String) -> Self {
        ContentStatus::from(value.as_str())
    }
}

impl From<ContentStatus> for String {
    fn from(value: ContentStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A post or comment, as loaded from the host content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub kind: ContentKind,
    /// Host content type (`post`, `page`, `note`, ...)
    pub content_type: String,
    pub status: ContentStatus,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    /// Raw body as stored by the host
    pub body: String,
    /// Tag names
    #[serde(default)]
    pub tags: Vec<String>,
    /// Category slugs
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub author_id: u64,
    /// ID the host federates this item under
    pub federated_id: String,
}

impl ContentItem {
    /// Create a published post with empty fields.
    pub fn post(id: ContentId, federated_id: impl Into<String>) -> Self {
        Self {
            id,
            kind: ContentKind::Post,
            content_type: "post".to_string(),
            status: ContentStatus::Publish,
            title: String::new(),
            slug: String::new(),
            excerpt: String::new(),
            body: String::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            password: None,
            author_id: 1,
            federated_id: federated_id.into(),
        }
    }

    /// Create an approved comment.
    pub fn comment(id: ContentId, federated_id: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Comment,
            content_type: "comment".to_string(),
            ..Self::post(id, federated_id)
        }
    }

    pub fn with_status(mut self, status: ContentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn is_password_protected(&self) -> bool {
        self.password.as_deref().map_or(false, |p| !p.is_empty())
    }

    pub fn in_category(&self, slug: &str) -> bool {
        self.categories.iter().any(|c| c == slug)
    }
}

/// An observed status change for one content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub content_id: ContentId,
    pub old_status: ContentStatus,
    pub new_status: ContentStatus,
}

impl StatusTransition {
    pub fn new(content_id: ContentId, old_status: ContentStatus, new_status: ContentStatus) -> Self {
        Self {
            content_id,
            old_status,
            new_status,
        }
    }
}
