//! In-memory store for deterministic testing.
//!
//! Mirrors the PostgreSQL repositories: id-ordered listing, template
//! selection for scales and categories, unique external ids, and
//! `NotFound` when updating a row that was never inserted.
//!
//! ## Usage
//!
//! ```rust
//! use annotool_engine::memory::MemoryStore;
//!
//! let store = MemoryStore::new();
//! assert!(store.videos.is_empty());
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use annotool_core::{
    defaults, Annotation, Category, CategoryRepository, Comment, Entity, EntityKind, Error,
    Label, ListQuery, Repository, Result, Scale, ScaleValue, Store, Track, User, UserRepository,
    Video, VideoRepository,
};

/// Builds the error returned for an injected write failure.
pub type FailureFn = fn(Uuid) -> Error;

/// One in-memory table.
pub struct MemoryRepository<E> {
    rows: RwLock<BTreeMap<Uuid, E>>,
    unique_key: Option<fn(&E) -> &str>,
    order: Option<fn(&E, &E) -> Ordering>,
    failures: Mutex<HashMap<Uuid, FailureFn>>,
    fail_all: Mutex<Option<FailureFn>>,
    writes: Mutex<usize>,
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            unique_key: None,
            order: None,
            failures: Mutex::new(HashMap::new()),
            fail_all: Mutex::new(None),
            writes: Mutex::new(0),
        }
    }

    /// Reject inserts whose key equals an existing row's key.
    pub fn with_unique_key(mut self, key: fn(&E) -> &str) -> Self {
        self.unique_key = Some(key);
        self
    }

    /// List in this order instead of id order.
    pub fn with_order(mut self, order: fn(&E, &E) -> Ordering) -> Self {
        self.order = Some(order);
        self
    }

    /// Make every insert or update of `id` fail with `failure(id)`.
    pub fn fail_writes_for(&self, id: Uuid, failure: FailureFn) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(id, failure);
        }
    }

    /// Make every insert or update on this table fail.
    pub fn fail_all_writes(&self, failure: FailureFn) {
        if let Ok(mut fail_all) = self.fail_all.lock() {
            *fail_all = Some(failure);
        }
    }

    /// Number of successful inserts and updates so far.
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }

    /// Number of rows, deleted or not.
    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every row, deleted or not, in id order.
    pub fn all(&self) -> Vec<E> {
        self.rows
            .read()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check_failure(&self, id: Uuid) -> Result<()> {
        let fail_all = *self.fail_all.lock().map_err(|_| poisoned(E::KIND))?;
        if let Some(failure) = fail_all {
            return Err(failure(id));
        }
        let failures = self.failures.lock().map_err(|_| poisoned(E::KIND))?;
        match failures.get(&id) {
            Some(failure) => Err(failure(id)),
            None => Ok(()),
        }
    }

    fn record_write(&self) {
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
    }

    fn parent_matches(entity: &E, parent_id: Option<Uuid>) -> bool {
        match parent_id {
            Some(parent_id) => entity.parent_id() == Some(parent_id),
            None => match E::KIND {
                EntityKind::Scale | EntityKind::Category => entity.parent_id().is_none(),
                _ => true,
            },
        }
    }

    fn find_live(&self, predicate: impl Fn(&E) -> bool) -> Result<Vec<E>> {
        let rows = self.rows.read().map_err(|_| poisoned(E::KIND))?;
        Ok(rows
            .values()
            .filter(|row| !row.resource().is_deleted() && predicate(row))
            .cloned()
            .collect())
    }
}

fn poisoned(kind: EntityKind) -> Error {
    Error::Server(format!("{} table lock poisoned", kind))
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn insert(&self, entity: &E) -> Result<()> {
        self.check_failure(entity.id())?;
        let mut rows = self.rows.write().map_err(|_| poisoned(E::KIND))?;
        if rows.contains_key(&entity.id()) {
            return Err(Error::Duplicate(format!("{} {} already exists", E::KIND, entity.id())));
        }
        if let Some(key) = self.unique_key {
            let new_key = key(entity);
            if rows.values().any(|row| key(row) == new_key) {
                return Err(Error::Duplicate(format!(
                    "{} with key {} already exists",
                    E::KIND,
                    new_key
                )));
            }
        }
        rows.insert(entity.id(), entity.clone());
        drop(rows);
        self.record_write();
        Ok(())
    }

    async fn update(&self, entity: &E) -> Result<()> {
        self.check_failure(entity.id())?;
        let mut rows = self.rows.write().map_err(|_| poisoned(E::KIND))?;
        match rows.get_mut(&entity.id()) {
            Some(row) => *row = entity.clone(),
            None => {
                return Err(Error::NotFound(format!(
                    "{} {} not found",
                    E::KIND,
                    entity.id()
                )))
            }
        }
        drop(rows);
        self.record_write();
        Ok(())
    }

    async fn get(&self, id: Uuid, include_deleted: bool) -> Result<Option<E>> {
        let rows = self.rows.read().map_err(|_| poisoned(E::KIND))?;
        Ok(rows
            .get(&id)
            .filter(|row| include_deleted || !row.resource().is_deleted())
            .cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<E>> {
        let rows = self.rows.read().map_err(|_| poisoned(E::KIND))?;
        let mut items: Vec<E> = rows
            .values()
            .filter(|row| Self::parent_matches(row, query.parent_id))
            .filter(|row| query.include_deleted || !row.resource().is_deleted())
            .filter(|row| match query.since {
                Some(since) => row.resource().last_modified().is_some_and(|at| at >= since),
                None => true,
            })
            .cloned()
            .collect();
        drop(rows);

        if let Some(order) = self.order {
            items.sort_by(order);
        }

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query
            .limit
            .map(|l| l.clamp(0, defaults::PAGE_LIMIT_MAX) as usize)
            .unwrap_or(usize::MAX);
        Ok(items.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl UserRepository for MemoryRepository<User> {
    async fn find_by_ext_id(&self, ext_id: &str) -> Result<Option<User>> {
        Ok(self.find_live(|u| u.ext_id == ext_id)?.into_iter().next())
    }
}

#[async_trait]
impl VideoRepository for MemoryRepository<Video> {
    async fn find_by_ext_id(&self, ext_id: &str) -> Result<Option<Video>> {
        Ok(self.find_live(|v| v.ext_id == ext_id)?.into_iter().next())
    }
}

#[async_trait]
impl CategoryRepository for MemoryRepository<Category> {
    async fn find_by_series_ext_id(&self, series_ext_id: &str) -> Result<Vec<Category>> {
        self.find_live(|c| c.series_ext_id.as_deref() == Some(series_ext_id))
    }

    async fn find_by_series_category_id(
        &self,
        series_category_id: Uuid,
    ) -> Result<Vec<Category>> {
        self.find_live(|c| c.series_category_id == Some(series_category_id))
    }
}

fn user_ext_id(user: &User) -> &str {
    &user.ext_id
}

fn video_ext_id(video: &Video) -> &str {
    &video.ext_id
}

fn scale_value_order(a: &ScaleValue, b: &ScaleValue) -> Ordering {
    a.order.cmp(&b.order).then(a.resource.id.cmp(&b.resource.id))
}

/// Every table in memory.
pub struct MemoryStore {
    pub users: MemoryRepository<User>,
    pub videos: MemoryRepository<Video>,
    pub tracks: MemoryRepository<Track>,
    pub annotations: MemoryRepository<Annotation>,
    pub comments: MemoryRepository<Comment>,
    pub scales: MemoryRepository<Scale>,
    pub scale_values: MemoryRepository<ScaleValue>,
    pub categories: MemoryRepository<Category>,
    pub labels: MemoryRepository<Label>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: MemoryRepository::new().with_unique_key(user_ext_id),
            videos: MemoryRepository::new().with_unique_key(video_ext_id),
            tracks: MemoryRepository::new(),
            annotations: MemoryRepository::new(),
            comments: MemoryRepository::new(),
            scales: MemoryRepository::new(),
            scale_values: MemoryRepository::new().with_order(scale_value_order),
            categories: MemoryRepository::new(),
            labels: MemoryRepository::new(),
        }
    }
}

impl Store for MemoryStore {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn videos(&self) -> &dyn VideoRepository {
        &self.videos
    }

    fn tracks(&self) -> &dyn Repository<Track> {
        &self.tracks
    }

    fn annotations(&self) -> &dyn Repository<Annotation> {
        &self.annotations
    }

    fn comments(&self) -> &dyn Repository<Comment> {
        &self.comments
    }

    fn scales(&self) -> &dyn Repository<Scale> {
        &self.scales
    }

    fn scale_values(&self) -> &dyn Repository<ScaleValue> {
        &self.scale_values
    }

    fn categories(&self) -> &dyn CategoryRepository {
        &self.categories
    }

    fn labels(&self) -> &dyn Repository<Label> {
        &self.labels
    }
}
