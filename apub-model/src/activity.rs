//! Wire-format activities.
//!
//! The federation host serializes either a full activity (`Create`, `Update`,
//! ...) wrapping a base object, or a bare base object (a `Note`, `Article`,
//! ...). Both shapes share addressing fields; [`Audience`] hides the
//! difference from callers that only touch `to`/`cc`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The ActivityStreams public collection.
pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Activity verbs the add-on derives or rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Create,
    Update,
    Delete,
    Announce,
    Like,
    Undo,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "Create",
            Verb::Update => "Update",
            Verb::Delete => "Delete",
            Verb::Announce => "Announce",
            Verb::Like => "Like",
            Verb::Undo => "Undo",
        }
    }

    /// Parse a wire `type` value. Verbs the add-on never handles yield `None`.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "Create" => Some(Verb::Create),
            "Update" => Some(Verb::Update),
            "Delete" => Some(Verb::Delete),
            "Announce" => Some(Verb::Announce),
            "Like" => Some(Verb::Like),
            "Undo" => Some(Verb::Undo),
            _ => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addressing accessors shared by both wire shapes.
pub trait Audience {
    fn to(&self) -> &[String];
    fn cc(&self) -> &[String];
    fn to_mut(&mut self) -> &mut Vec<String>;
    fn cc_mut(&mut self) -> &mut Vec<String>;

    /// Whether `recipient` appears in either list.
    fn addresses(&self, recipient: &str) -> bool {
        self.to().iter().chain(self.cc()).any(|r| r == recipient)
    }
}

/// A base object: the `Note`/`Article` a local post or comment federates as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "attributedTo", default, skip_serializing_if = "Option::is_none")]
    pub attributed_to: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(rename = "inReplyTo", default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "contentMap", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content_map: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<Value>,
    /// Fields the add-on never interprets, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl BaseObject {
    /// Create an empty object of the given type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            attributed_to: None,
            to: Vec::new(),
            cc: Vec::new(),
            published: None,
            updated: None,
            in_reply_to: None,
            content: None,
            content_map: BTreeMap::new(),
            tag: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Set the object ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the addressing lists.
    pub fn with_audience(mut self, to: Vec<String>, cc: Vec<String>) -> Self {
        self.to = to;
        self.cc = cc;
        self
    }

    /// Set `content` and a single-locale `contentMap`.
    pub fn with_content(mut self, locale: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        self.content_map.insert(locale.into(), content.clone());
        self.content = Some(content);
        self
    }

    /// Replace `content` and every `contentMap` translation.
    pub fn replace_content(&mut self, content: &str) {
        self.content = Some(content.to_string());
        for value in self.content_map.values_mut() {
            *value = content.to_string();
        }
    }
}

impl Audience for BaseObject {
    fn to(&self) -> &[String] {
        &self.to
    }

    fn cc(&self) -> &[String] {
        &self.cc
    }

    fn to_mut(&mut self) -> &mut Vec<String> {
        &mut self.to
    }

    fn cc_mut(&mut self) -> &mut Vec<String> {
        &mut self.cc
    }
}

/// What an activity acts upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    /// A bare URL (Announce/Like of a remote object)
    Link(String),
    /// A nested activity (Undo of a stored Announce/Like)
    Activity(Box<Activity>),
    /// An embedded base object (Create/Update/Delete of local content)
    Object(Box<BaseObject>),
}

impl ObjectRef {
    /// ID of the referenced object, whatever its shape.
    pub fn id(&self) -> Option<&str> {
        match self {
            ObjectRef::Link(url) => Some(url),
            ObjectRef::Activity(activity) => activity.id.as_deref(),
            ObjectRef::Object(object) => object.id.as_deref(),
        }
    }
}

/// A wrapping activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub object: ObjectRef,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Activity {
    /// Wrap a base object in an activity of the given verb.
    pub fn wrap(verb: Verb, actor: impl Into<String>, object: BaseObject) -> Self {
        Self {
            context: None,
            id: None,
            kind: verb.as_str().to_string(),
            actor: Some(actor.into()),
            to: object.to.clone(),
            cc: object.cc.clone(),
            published: object.published.clone(),
            updated: None,
            object: ObjectRef::Object(Box::new(object)),
            extra: BTreeMap::new(),
        }
    }

    /// Set the activity ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn verb(&self) -> Option<Verb> {
        Verb::parse(&self.kind)
    }

    /// Drop everything but `@context`, `id`, `type`, `actor`, `published`,
    /// `to`, `cc` and `object`.
    pub fn retain_minimal(&mut self) {
        self.updated = None;
        self.extra.clear();
    }

    /// The embedded base object, if the activity carries one.
    pub fn embedded(&self) -> Option<&BaseObject> {
        match &self.object {
            ObjectRef::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn embedded_mut(&mut self) -> Option<&mut BaseObject> {
        match &mut self.object {
            ObjectRef::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl Audience for Activity {
    fn to(&self) -> &[String] {
        &self.to
    }

    fn cc(&self) -> &[String] {
        &self.cc
    }

    fn to_mut(&mut self) -> &mut Vec<String> {
        &mut self.to
    }

    fn cc_mut(&mut self) -> &mut Vec<String> {
        &mut self.cc
    }
}

/// An outgoing payload in either of its two shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireObject {
    Activity(Activity),
    Object(BaseObject),
}

impl WireObject {
    /// Verb of a wrapping activity; bare objects have none.
    pub fn verb(&self) -> Option<Verb> {
        match self {
            WireObject::Activity(activity) => activity.verb(),
            WireObject::Object(_) => None,
        }
    }

    pub fn as_activity(&self) -> Option<&Activity> {
        match self {
            WireObject::Activity(activity) => Some(activity),
            WireObject::Object(_) => None,
        }
    }

    pub fn as_activity_mut(&mut self) -> Option<&mut Activity> {
        match self {
            WireObject::Activity(activity) => Some(activity),
            WireObject::Object(_) => None,
        }
    }

    /// The base object carrying the content: the embedded object of an
    /// activity, or the bare object itself.
    pub fn content_object(&self) -> Option<&BaseObject> {
        match self {
            WireObject::Activity(activity) => activity.embedded(),
            WireObject::Object(object) => Some(object),
        }
    }

    pub fn content_object_mut(&mut self) -> Option<&mut BaseObject> {
        match self {
            WireObject::Activity(activity) => activity.embedded_mut(),
            WireObject::Object(object) => Some(object),
        }
    }

    /// ID of the local object this payload is about.
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            WireObject::Activity(activity) => activity.object.id(),
            WireObject::Object(object) => object.id.as_deref(),
        }
    }

    /// Copy the outer addressing into an embedded object, if any.
    pub fn mirror_audience(&mut self) {
        if let WireObject::Activity(activity) = self {
            let (to, cc) = (activity.to.clone(), activity.cc.clone());
            if let Some(object) = activity.embedded_mut() {
                object.to = to;
                object.cc = cc;
            }
        }
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Parse a JSON value produced by the host.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

impl Audience for WireObject {
    fn to(&self) -> &[String] {
        match self {
            WireObject::Activity(activity) => &activity.to,
            WireObject::Object(object) => &object.to,
        }
    }

    fn cc(&self) -> &[String] {
        match self {
            WireObject::Activity(activity) => &activity.cc,
            WireObject::Object(object) => &object.cc,
        }
    }

    fn to_mut(&mut self) -> &mut Vec<String> {
        match self {
            WireObject::Activity(activity) => &mut activity.to,
            WireObject::Object(object) => &mut object.to,
        }
    }

    fn cc_mut(&mut self) -> &mut Vec<String> {
        match self {
            WireObject::Activity(activity) => &mut activity.cc,
            WireObject::Object(object) => &mut object.cc,
        }
    }
}
