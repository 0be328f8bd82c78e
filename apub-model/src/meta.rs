//! Per-item metadata keys.

use serde::{Deserialize, Serialize};

/// Metadata the add-on attaches to content items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaKey {
    /// Fingerprint of the last federated revision
    Fingerprint,
    InReplyToUrl,
    InReplyToActor,
    RepostOfUrl,
    RepostOfActor,
    LikeOfUrl,
    LikeOfActor,
    /// Announce sent for a repost, kept until undone
    AnnounceActivity,
    /// Like sent for a like post, kept until undone
    LikeActivity,
    UndoActivity,
}

impl MetaKey {
    /// Storage key as written to the host.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKey::Fingerprint => "_apub_addon_hash",
            MetaKey::InReplyToUrl => "_apub_addon_in_reply_to_url",
            MetaKey::InReplyToActor => "_apub_addon_in_reply_to_actor",
            MetaKey::RepostOfUrl => "_apub_addon_repost_of_url",
            MetaKey::RepostOfActor => "_apub_addon_repost_of_actor",
            MetaKey::LikeOfUrl => "_apub_addon_like_of_url",
            MetaKey::LikeOfActor => "_apub_addon_like_of_actor",
            MetaKey::AnnounceActivity => "_apub_addon_announce_activity",
            MetaKey::LikeActivity => "_apub_addon_like_activity",
            MetaKey::UndoActivity => "_apub_addon_undo_activity",
        }
    }
}

/// Kinds of remote targets a post body can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    InReplyTo,
    RepostOf,
    LikeOf,
}

impl TargetKind {
    pub const ALL: [TargetKind; 3] = [TargetKind::InReplyTo, TargetKind::RepostOf, TargetKind::LikeOf];

    pub fn url_key(&self) -> MetaKey {
        match self {
            TargetKind::InReplyTo => MetaKey::InReplyToUrl,
            TargetKind::RepostOf => MetaKey::RepostOfUrl,
            TargetKind::LikeOf => MetaKey::LikeOfUrl,
        }
    }

    pub fn actor_key(&self) -> MetaKey {
        match self {
            TargetKind::InReplyTo => MetaKey::InReplyToActor,
            TargetKind::RepostOf => MetaKey::RepostOfActor,
            TargetKind::LikeOf => MetaKey::LikeOfActor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::InReplyTo => "in-reply-to",
            TargetKind::RepostOf => "repost-of",
            TargetKind::LikeOf => "like-of",
        }
    }
}

/// The account a reply, repost or like targets, ready to be mentioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorMention {
    /// `user@host`, without the leading `@`
    pub handle: String,
    pub actor_url: String,
}

impl ActorMention {
    pub fn new(handle: impl Into<String>, actor_url: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            actor_url: actor_url.into(),
        }
    }

    /// Mention-map key (`@user@host`).
    pub fn mention_name(&self) -> String {
        format!("@{}", self.handle)
    }
}
