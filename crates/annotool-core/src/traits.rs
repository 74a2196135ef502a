//! Core traits for annotool abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::Capability;
use crate::error::Result;
use crate::models::*;
use crate::resource::{Entity, Tags};

// =============================================================================
// LIST QUERY
// =============================================================================

/// Parameters for listing entities.
///
/// Repositories apply `parent_id`, `since`, `include_deleted`, `offset` and
/// `limit`. The tag maps are applied afterwards by the engine.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Owning parent. For scales and categories `None` selects templates.
    pub parent_id: Option<Uuid>,
    /// Pagination offset
    pub offset: Option<i64>,
    /// Maximum results
    pub limit: Option<i64>,
    /// Keep rows last modified at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Every pair must match
    pub tags_and: Tags,
    /// At least one pair must match
    pub tags_or: Tags,
    /// Include soft-deleted rows (admin only)
    pub include_deleted: bool,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live children of `parent_id`.
    pub fn children_of(parent_id: Uuid) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, offset: Option<i64>, limit: Option<i64>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_tags_and(mut self, tags: Tags) -> Self {
        self.tags_and = tags;
        self
    }

    pub fn with_tags_or(mut self, tags: Tags) -> Self {
        self.tags_or = tags;
        self
    }

    pub fn including_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

/// Persistence for one entity kind.
///
/// Each call is its own transaction. Audit stamping is the caller's job; the
/// repository stores exactly what it is given.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Insert a new row. Fails with `Duplicate` on a uniqueness violation.
    async fn insert(&self, entity: &E) -> Result<()>;

    /// Overwrite the row with the entity's id. Fails with `NotFound` if no
    /// row with that id exists, deleted or not.
    async fn update(&self, entity: &E) -> Result<()>;

    /// Fetch by id, optionally including soft-deleted rows.
    async fn get(&self, id: Uuid, include_deleted: bool) -> Result<Option<E>>;

    /// List rows matching the query (tags not applied).
    async fn list(&self, query: &ListQuery) -> Result<Vec<E>>;
}

/// User persistence with lookup by external id.
#[async_trait]
pub trait UserRepository: Repository<User> {
    /// Live user with the given external id.
    async fn find_by_ext_id(&self, ext_id: &str) -> Result<Option<User>>;
}

/// Video persistence with lookup by external id.
#[async_trait]
pub trait VideoRepository: Repository<Video> {
    /// Live video with the given external id.
    async fn find_by_ext_id(&self, ext_id: &str) -> Result<Option<Video>>;
}

/// Category persistence with the series lookups that cross video boundaries.
#[async_trait]
pub trait CategoryRepository: Repository<Category> {
    /// Live categories carrying `series_ext_id`, across all videos.
    async fn find_by_series_ext_id(&self, series_ext_id: &str) -> Result<Vec<Category>>;

    /// Live categories linked to the master `series_category_id`, across all videos.
    async fn find_by_series_category_id(&self, series_category_id: Uuid)
        -> Result<Vec<Category>>;
}

/// One repository per entity kind.
pub trait Store: Send + Sync {
    fn users(&self) -> &dyn UserRepository;
    fn videos(&self) -> &dyn VideoRepository;
    fn tracks(&self) -> &dyn Repository<Track>;
    fn annotations(&self) -> &dyn Repository<Annotation>;
    fn comments(&self) -> &dyn Repository<Comment>;
    fn scales(&self) -> &dyn Repository<Scale>;
    fn scale_values(&self) -> &dyn Repository<ScaleValue>;
    fn categories(&self) -> &dyn CategoryRepository;
    fn labels(&self) -> &dyn Repository<Label>;
}

// =============================================================================
// VIDEO INTERFACE
// =============================================================================

/// A playable media track of a video, as reported by the video platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaTrack {
    pub flavor: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

/// What the video platform knows about a video for one caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAccess {
    pub title: Option<String>,
    pub capability: Capability,
    #[serde(default)]
    pub tracks: Vec<MediaTrack>,
}

impl VideoAccess {
    /// Access with the given capability and no platform metadata.
    pub fn with_capability(capability: Capability) -> Self {
        Self {
            title: None,
            capability,
            tracks: Vec::new(),
        }
    }
}

/// The external video platform, queried to resolve a caller's capability.
#[async_trait]
pub trait VideoInterface: Send + Sync {
    async fn resolve(&self, video: &Video, user: &User) -> Result<VideoAccess>;
}

/// Grants the same capability for every video.
///
/// Used by operator tooling, which acts with administrative rights.
#[derive(Debug, Clone, Copy)]
pub struct FixedVideoInterface {
    capability: Capability,
}

impl FixedVideoInterface {
    pub fn new(capability: Capability) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl VideoInterface for FixedVideoInterface {
    async fn resolve(&self, _video: &Video, _user: &User) -> Result<VideoAccess> {
        Ok(VideoAccess::with_capability(self.capability))
    }
}
