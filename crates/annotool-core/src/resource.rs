//! The audit, access and tag envelope embedded in every entity.
//!
//! Every row in the system carries a [`Resource`]. Rows are never physically
//! removed: termination is a soft delete that stamps `deleted_by` and
//! `deleted_at` together, after which the row is absent from every non-admin
//! query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Free-form key/value tags attached to a resource. Key order is irrelevant.
pub type Tags = HashMap<String, String>;

// =============================================================================
// ACCESS
// =============================================================================

/// Visibility of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Access {
    /// Only the creator/updater and video admins
    #[default]
    Private,
    /// Everyone
    Public,
    /// Creator/updater and video admins
    SharedWithAdmin,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "PRIVATE"),
            Self::Public => write!(f, "PUBLIC"),
            Self::SharedWithAdmin => write!(f, "SHARED_WITH_ADMIN"),
        }
    }
}

impl std::str::FromStr for Access {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PRIVATE" => Ok(Self::Private),
            "PUBLIC" => Ok(Self::Public),
            "SHARED_WITH_ADMIN" => Ok(Self::SharedWithAdmin),
            _ => Err(format!("Invalid access level: {}", s)),
        }
    }
}

// =============================================================================
// RESOURCE
// =============================================================================

/// Audit/access/tag envelope.
///
/// `id` is nil until the store creates the row; afterwards it never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    #[serde(default)]
    pub access: Access,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub deleted_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Tags,
}

impl Resource {
    /// Envelope with the given access level and no audit data.
    pub fn with_access(access: Access) -> Self {
        Self {
            access,
            ..Self::default()
        }
    }

    /// True until the store has assigned an id.
    pub fn is_new(&self) -> bool {
        self.id.is_nil()
    }

    /// True once the row has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Last modification instant, falling back to creation.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    /// Value of a single tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// True when `user_id` created or last updated this resource.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == Some(user_id) || self.updated_by == Some(user_id)
    }

    pub fn stamp_created(&mut self, by: Uuid, at: DateTime<Utc>) {
        self.created_by = Some(by);
        self.created_at = Some(at);
    }

    pub fn stamp_updated(&mut self, by: Uuid, at: DateTime<Utc>) {
        self.updated_by = Some(by);
        self.updated_at = Some(at);
    }

    /// Mark as deleted. `deleted_by` and `deleted_at` are always set together.
    pub fn stamp_deleted(&mut self, by: Uuid, at: DateTime<Utc>) {
        self.deleted_by = Some(by);
        self.deleted_at = Some(at);
    }

    /// Copy the caller-mutable parts of the envelope (access and tags).
    pub fn apply_update(&mut self, changes: &Resource) {
        self.access = changes.access;
        self.tags = changes.tags.clone();
    }
}

// =============================================================================
// ENTITY TRAIT
// =============================================================================

/// The nine entity kinds managed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Video,
    Track,
    Annotation,
    Scale,
    ScaleValue,
    Category,
    Label,
    Comment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Video => "video",
            Self::Track => "track",
            Self::Annotation => "annotation",
            Self::Scale => "scale",
            Self::ScaleValue => "scale_value",
            Self::Category => "category",
            Self::Label => "label",
            Self::Comment => "comment",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared behaviour of every stored entity.
pub trait Entity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn resource(&self) -> &Resource;

    fn resource_mut(&mut self) -> &mut Resource;

    /// Id of the owning parent row, if the entity has one.
    fn parent_id(&self) -> Option<Uuid>;

    /// Apply caller-supplied mutable fields from `changes` onto this live row.
    ///
    /// The id, audit stamps and owning parent are left untouched.
    fn apply_update(&mut self, changes: &Self);

    fn id(&self) -> Uuid {
        self.resource().id
    }
}
