//! Stored document types.
//!
//! Documents serialize with camelCase field names and `_id` for the
//! identifier, the shape the frontend reads. Each type declares its
//! collection, required fields and unique indexes; the store enforces them
//! on every write.

use chrono::{DateTime, Utc};
use pathway_core::ResourceId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A type that can live in a collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name, used in logs and errors.
    const COLLECTION: &'static str;

    /// Wire names of fields that must be present, non-null and non-empty.
    const REQUIRED: &'static [&'static str] = &[];

    /// Unique indexes, each a list of wire field names.
    ///
    /// An index is skipped for a document when any of its fields is absent
    /// or null.
    const UNIQUE: &'static [&'static [&'static str]] = &[];

    /// Returns the document's id.
    fn id(&self) -> ResourceId;
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document id.
    #[serde(rename = "_id")]
    pub id: ResourceId,
    /// Email address, normalized at signup.
    #[serde(default)]
    pub email: Option<String>,
    /// Login name.
    pub username: String,
    /// Bcrypt hash. `None` for OAuth-only accounts and in every reply.
    #[serde(default)]
    pub password: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Google account subject, set for users who signed in with Google.
    #[serde(default)]
    pub google_id: Option<String>,
    /// Users following this user.
    #[serde(default)]
    pub suscribers: Vec<ResourceId>,
    /// Paths this user authored.
    #[serde(default)]
    pub paths: Vec<ResourceId>,
    /// Paths this user follows.
    #[serde(default)]
    pub suscriptions: Vec<ResourceId>,
    /// Paths this user marked as favorite.
    #[serde(default)]
    pub favorites: Vec<ResourceId>,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last write time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A new user with only a username set.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ResourceId::new(),
            email: None,
            username: username.into(),
            password: None,
            name: None,
            image: None,
            google_id: None,
            suscribers: Vec::new(),
            paths: Vec::new(),
            suscriptions: Vec::new(),
            favorites: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The same user with the password hash cleared, for replies.
    #[must_use]
    pub fn redacted(mut self) -> Self {
        self.password = None;
        self
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    const REQUIRED: &'static [&'static str] = &["username"];
    const UNIQUE: &'static [&'static [&'static str]] = &[&["username"], &["email"], &["googleId"]];

    fn id(&self) -> ResourceId {
        self.id
    }
}

/// A learning path: an ordered collection of topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    /// Document id.
    #[serde(rename = "_id")]
    pub id: ResourceId,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// One-line summary.
    #[serde(default)]
    pub short_desc: String,
    /// Difficulty level.
    #[serde(default)]
    pub level: Option<String>,
    /// Subject category.
    #[serde(default)]
    pub category: Option<String>,
    /// Authoring user.
    #[serde(default)]
    pub author: Option<ResourceId>,
    /// Topics in order.
    #[serde(default)]
    pub topics: Vec<ResourceId>,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last write time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Document for LearningPath {
    const COLLECTION: &'static str = "paths";
    const REQUIRED: &'static [&'static str] = &["title", "shortDesc"];

    fn id(&self) -> ResourceId {
        self.id
    }
}

/// One unit of a learning path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Document id.
    #[serde(rename = "_id")]
    pub id: ResourceId,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// What the learner gets out of it.
    #[serde(default)]
    pub objective: String,
    /// Expected time to complete, free text.
    #[serde(default)]
    pub duration: Option<String>,
    /// Body text or links.
    #[serde(default)]
    pub content: Option<String>,
    /// The path this topic belongs to.
    #[serde(default)]
    pub path: Option<ResourceId>,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last write time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Topic {
    const COLLECTION: &'static str = "topics";
    const REQUIRED: &'static [&'static str] = &["title", "objective"];

    fn id(&self) -> ResourceId {
        self.id
    }
}

/// A user following a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Document id.
    #[serde(rename = "_id")]
    pub id: ResourceId,
    /// Subscribing user.
    pub user: ResourceId,
    /// Followed path.
    pub path: ResourceId,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last write time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// A new subscription of `user` to `path`.
    #[must_use]
    pub fn new(user: ResourceId, path: ResourceId) -> Self {
        let now = Utc::now();
        Self {
            id: ResourceId::new(),
            user,
            path,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Document for Subscription {
    const COLLECTION: &'static str = "subscriptions";
    const REQUIRED: &'static [&'static str] = &["user", "path"];
    const UNIQUE: &'static [&'static [&'static str]] = &[&["user", "path"]];

    fn id(&self) -> ResourceId {
        self.id
    }
}

/// A path a user marked as favorite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    /// Document id.
    #[serde(rename = "_id")]
    pub id: ResourceId,
    /// The user.
    pub user: ResourceId,
    /// The favorite path.
    pub path: ResourceId,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last write time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Favorite {
    /// A new favorite of `user` on `path`.
    #[must_use]
    pub fn new(user: ResourceId, path: ResourceId) -> Self {
        let now = Utc::now();
        Self {
            id: ResourceId::new(),
            user,
            path,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Document for Favorite {
    const COLLECTION: &'static str = "favorites";
    const REQUIRED: &'static [&'static str] = &["user", "path"];
    const UNIQUE: &'static [&'static [&'static str]] = &[&["user", "path"]];

    fn id(&self) -> ResourceId {
        self.id
    }
}
