//! Service façade over the engine.
//!
//! Every operation runs for a calling [`User`] and is guarded by the access
//! gate: the caller's capability on the owning video comes from the
//! [`VideoInterface`], templates resolve to `Capability::None`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use annotool_core::{
    filter_by_tags, has_access, logging, new_v7, Annotation, Capability, Category,
    CategoryRepository, Comment, Entity, EntityKind, Error, Label, ListQuery, Repository, Result,
    Scale, ScaleValue, Store, Track, User, UserRepository, Video, VideoInterface,
    VideoRepository,
};

use crate::cascade::HierarchyCascade;
use crate::cloner::TemplateCloner;
use crate::resources::ResourceStore;
use crate::series::SeriesSync;

// =============================================================================
// REPOSITORY SELECTION
// =============================================================================

/// An entity whose repository can be picked from a [`Store`].
pub trait Stored: Entity {
    type Repo<'s>: Repository<Self> + ?Sized;

    fn repository(store: &dyn Store) -> &Self::Repo<'_>;
}

impl Stored for User {
    type Repo<'s> = dyn UserRepository + 's;

    fn repository(store: &dyn Store) -> &Self::Repo<'_> {
        store.users()
    }
}

impl Stored for Video {
    type Repo<'s> = dyn VideoRepository + 's;

    fn repository(store: &dyn Store) -> &Self::Repo<'_> {
        store.videos()
    }
}

impl Stored for Track {
    type Repo<'s> = dyn Repository<Track> + 's;

    fn repository(store: &dyn Store) -> &Self::Repo<'_> {
        store.tracks()
    }
}

impl Stored for Annotation {
    type Repo<'s> = dyn Repository<Annotation> + 's;

    fn repository(store: &dyn Store) -> &Self::Repo<'_> {
        store.annotations()
    }
}

impl Stored for Comment {
    type Repo<'s> = dyn Repository<Comment> + 's;

    fn repository(store: &dyn Store) -> &Self::Repo<'_> {
        store.comments()
    }
}

impl Stored for Scale {
    type Repo<'s> = dyn Repository<Scale> + 's;

    fn repository(store: &dyn Store) -> &Self::Repo<'_> {
        store.scales()
    }
}

impl Stored for ScaleValue {
    type Repo<'s> = dyn Repository<ScaleValue> + 's;

    fn repository(store: &dyn Store) -> &Self::Repo<'_> {
        store.scale_values()
    }
}

impl Stored for Category {
    type Repo<'s> = dyn CategoryRepository + 's;

    fn repository(store: &dyn Store) -> &Self::Repo<'_> {
        store.categories()
    }
}

impl Stored for Label {
    type Repo<'s> = dyn Repository<Label> + 's;

    fn repository(store: &dyn Store) -> &Self::Repo<'_> {
        store.labels()
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Entry point for callers of the engine.
pub struct AnnotationService<S> {
    store: S,
    videos: Arc<dyn VideoInterface>,
}

impl<S: Store> AnnotationService<S> {
    pub fn new(store: S, videos: Arc<dyn VideoInterface>) -> Self {
        Self { store, videos }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn dyn_store(&self) -> &dyn Store {
        &self.store
    }

    fn resources(&self, caller: &User) -> ResourceStore<'_> {
        ResourceStore::new(&self.store, caller.id())
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Live user with `ext_id`, created on first sight.
    ///
    /// A new user is recorded as created by itself; the nickname defaults to
    /// the external id. An external id held by a deleted user is refused with
    /// `Unauthorized`.
    pub async fn resolve_user(
        &self,
        ext_id: &str,
        nickname: Option<&str>,
        email: Option<&str>,
    ) -> Result<User> {
        if let Some(user) = self.store.users().find_by_ext_id(ext_id).await? {
            return Ok(user);
        }

        let mut user = User::new(ext_id, nickname.unwrap_or(ext_id));
        user.email = email.map(str::to_string);
        user.resource.id = new_v7();
        let resources = ResourceStore::new(&self.store, user.id());

        match resources.create(self.store.users(), user).await {
            Ok(user) => {
                debug!(
                    subsystem = logging::SUBSYSTEM_ENGINE,
                    component = logging::COMPONENT_SERVICE,
                    op = "resolve_user",
                    user_id = %user.id(),
                    "User created on first sight"
                );
                Ok(user)
            }
            // Lost a race with a concurrent first sight, or the ext id belongs
            // to a deleted user
            Err(Error::Duplicate(_)) => match self.store.users().find_by_ext_id(ext_id).await? {
                Some(user) => Ok(user),
                None => Err(Error::Unauthorized(format!("user {} has been deleted", ext_id))),
            },
            Err(e) => Err(e),
        }
    }

    pub async fn create_user(&self, caller: &User, user: User) -> Result<User> {
        self.resources(caller)
            .create(self.store.users(), user)
            .await
    }

    pub async fn delete_user(&self, caller: &User, id: Uuid) -> Result<User> {
        self.guard_delete::<User>(caller, id).await?;
        self.resources(caller)
            .soft_delete(self.store.users(), id)
            .await
    }

    // -------------------------------------------------------------------------
    // Generic read/update
    // -------------------------------------------------------------------------

    /// Live entity visible to the caller.
    pub async fn get<E: Stored>(&self, caller: &User, id: Uuid) -> Result<E> {
        let entity = self.live::<E>(id).await?;
        self.ensure_access(caller, &entity).await?;
        Ok(entity)
    }

    /// Entity including soft-deleted rows; deleted rows need admin capability.
    pub async fn get_including_deleted<E: Stored>(&self, caller: &User, id: Uuid) -> Result<E> {
        let entity = E::repository(self.dyn_store())
            .get(id, true)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} {}", E::KIND, id)))?;
        let capability = self.capability_for(caller, &entity).await?;
        if entity.resource().is_deleted() && capability < Capability::Admin {
            return Err(Error::Unauthorized(format!(
                "{} {} is deleted",
                E::KIND,
                id
            )));
        }
        self.check(caller, &entity, capability)?;
        Ok(entity)
    }

    /// List rows, then apply the tag filters and the access gate.
    ///
    /// Soft-deleted rows, when requested, are only kept for admins.
    pub async fn list<E: Stored>(&self, caller: &User, query: &ListQuery) -> Result<Vec<E>> {
        let rows = E::repository(self.dyn_store()).list(query).await?;
        let rows = filter_by_tags(rows, &query.tags_and, &query.tags_or);

        let mut capabilities: HashMap<Option<Uuid>, Capability> = HashMap::new();
        let mut visible = Vec::with_capacity(rows.len());
        for row in rows {
            let key = match E::KIND {
                EntityKind::Video | EntityKind::User => Some(row.id()),
                _ => row.parent_id(),
            };
            let cached = capabilities.get(&key).copied();
            let capability = match cached {
                Some(capability) => capability,
                None => {
                    let capability = self.capability_for(caller, &row).await?;
                    capabilities.insert(key, capability);
                    capability
                }
            };
            if row.resource().is_deleted() && capability < Capability::Admin {
                continue;
            }
            if has_access(row.resource(), caller.id(), capability) {
                visible.push(row);
            }
        }
        Ok(visible)
    }

    /// Apply the caller-mutable fields of `changes` to the live row.
    ///
    /// Categories go through [`Self::update_category`].
    pub async fn update<E: Stored>(&self, caller: &User, changes: &E) -> Result<E> {
        let live = self.live::<E>(changes.id()).await?;
        self.ensure_access(caller, &live).await?;
        self.resources(caller)
            .update(E::repository(self.dyn_store()), changes)
            .await
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    pub async fn create_video(&self, caller: &User, video: Video) -> Result<Video> {
        self.resources(caller)
            .create(self.store.videos(), video)
            .await
    }

    pub async fn create_track(&self, caller: &User, track: Track) -> Result<Track> {
        self.require_parent::<Video>(caller, track.video_id).await?;
        self.resources(caller)
            .create(self.store.tracks(), track)
            .await
    }

    /// Label and scale value references must point to live rows.
    pub async fn create_annotation(
        &self,
        caller: &User,
        annotation: Annotation,
    ) -> Result<Annotation> {
        self.require_parent::<Track>(caller, annotation.track_id)
            .await?;
        self.require_reference::<Label>(annotation.label_id).await?;
        self.require_reference::<ScaleValue>(annotation.scale_value_id)
            .await?;
        self.resources(caller)
            .create(self.store.annotations(), annotation)
            .await
    }

    /// Create a comment, or a reply when `reply_to_id` is set.
    ///
    /// Replies must answer a live top-level comment on the same annotation.
    pub async fn create_comment(&self, caller: &User, comment: Comment) -> Result<Comment> {
        self.require_parent::<Annotation>(caller, comment.annotation_id)
            .await?;
        if let Some(reply_to) = comment.reply_to_id {
            let parent = self.store.comments().get(reply_to, false).await?;
            match parent {
                Some(parent)
                    if parent.annotation_id == comment.annotation_id
                        && parent.reply_to_id.is_none() => {}
                Some(_) => {
                    return Err(Error::BadRequest(format!(
                        "comment {} is not a top-level comment on annotation {}",
                        reply_to, comment.annotation_id
                    )))
                }
                None => {
                    return Err(Error::BadRequest(format!(
                        "comment {} does not exist",
                        reply_to
                    )))
                }
            }
        }
        self.resources(caller)
            .create(self.store.comments(), comment)
            .await
    }

    /// A scale without a video is a template.
    pub async fn create_scale(&self, caller: &User, scale: Scale) -> Result<Scale> {
        if let Some(video_id) = scale.video_id {
            self.require_parent::<Video>(caller, video_id).await?;
        }
        self.resources(caller)
            .create(self.store.scales(), scale)
            .await
    }

    pub async fn create_scale_value(&self, caller: &User, value: ScaleValue) -> Result<ScaleValue> {
        self.require_parent::<Scale>(caller, value.scale_id).await?;
        self.resources(caller)
            .create(self.store.scale_values(), value)
            .await
    }

    /// A category without a video is a template. A category created with a
    /// `series_ext_id` and no `series_category_id` becomes a series master.
    pub async fn create_category(&self, caller: &User, mut category: Category) -> Result<Category> {
        if let Some(video_id) = category.video_id {
            self.require_parent::<Video>(caller, video_id).await?;
        }
        self.require_reference::<Scale>(category.scale_id).await?;

        if category.series_ext_id.is_some() && category.series_category_id.is_none() {
            if category.resource.is_new() {
                category.resource.id = new_v7();
            }
            category.series_category_id = Some(category.resource.id);
        }
        self.resources(caller)
            .create(self.store.categories(), category)
            .await
    }

    pub async fn create_label(&self, caller: &User, label: Label) -> Result<Label> {
        self.require_parent::<Category>(caller, label.category_id)
            .await?;
        self.resources(caller)
            .create(self.store.labels(), label)
            .await
    }

    // -------------------------------------------------------------------------
    // Templates and series
    // -------------------------------------------------------------------------

    pub async fn create_scale_from_template(
        &self,
        caller: &User,
        video_id: Uuid,
        template_id: Uuid,
    ) -> Result<Scale> {
        self.require_parent::<Video>(caller, video_id).await?;
        let template = self.require_reference::<Scale>(Some(template_id)).await?;
        if template.is_some_and(|t| !t.is_template()) {
            return Err(Error::BadRequest(format!(
                "scale {} is not a template",
                template_id
            )));
        }
        TemplateCloner::new(self.resources(caller))
            .clone_scale(video_id, template_id)
            .await
    }

    pub async fn create_category_from_template(
        &self,
        caller: &User,
        video_id: Uuid,
        template_id: Uuid,
    ) -> Result<Category> {
        self.require_parent::<Video>(caller, video_id).await?;
        let template = self
            .require_reference::<Category>(Some(template_id))
            .await?;
        if template.is_some_and(|t| !t.is_template()) {
            return Err(Error::BadRequest(format!(
                "category {} is not a template",
                template_id
            )));
        }
        TemplateCloner::new(self.resources(caller))
            .clone_category(video_id, template_id, None, None)
            .await
    }

    /// Reconcile the video's categories with the series and return them.
    pub async fn sync_series(
        &self,
        caller: &User,
        video_id: Uuid,
        series_ext_id: &str,
    ) -> Result<Vec<Category>> {
        let video = self.live::<Video>(video_id).await?;
        self.ensure_access(caller, &video).await?;
        SeriesSync::new(self.resources(caller))
            .sync(video_id, series_ext_id)
            .await
    }

    /// List categories; with a series id and a video, the video is synced
    /// against the series first.
    pub async fn list_categories(
        &self,
        caller: &User,
        query: &ListQuery,
        series_ext_id: Option<&str>,
    ) -> Result<Vec<Category>> {
        if let (Some(video_id), Some(series_ext_id)) = (query.parent_id, series_ext_id) {
            self.sync_series(caller, video_id, series_ext_id).await?;
        }
        self.list(caller, query).await
    }

    /// Update a category. Moving a series master to another video deletes
    /// every other category linked to it.
    pub async fn update_category(&self, caller: &User, changes: &Category) -> Result<Category> {
        let mut live = self.live::<Category>(changes.id()).await?;
        self.ensure_access(caller, &live).await?;

        match changes.video_id {
            Some(new_video_id) if live.is_series_master() && live.video_id != Some(new_video_id) => {
                self.require_parent::<Video>(caller, new_video_id).await?;
                live.apply_update(changes);
                SeriesSync::new(self.resources(caller))
                    .update_category_and_delete_other_series_categories(live, new_video_id)
                    .await
            }
            _ => {
                self.resources(caller)
                    .update(self.store.categories(), changes)
                    .await
            }
        }
    }

    /// Direct replies to `reply_to`, or the top-level comments when absent.
    pub async fn list_comments(
        &self,
        caller: &User,
        annotation_id: Uuid,
        reply_to: Option<Uuid>,
        query: &ListQuery,
    ) -> Result<Vec<Comment>> {
        let mut query = query.clone();
        query.parent_id = Some(annotation_id);
        let comments = self.list::<Comment>(caller, &query).await?;
        Ok(comments
            .into_iter()
            .filter(|c| c.reply_to_id == reply_to)
            .collect())
    }

    // -------------------------------------------------------------------------
    // Delete
    // -------------------------------------------------------------------------

    pub async fn delete_video(&self, caller: &User, id: Uuid) -> Result<Video> {
        self.guard_delete::<Video>(caller, id).await?;
        self.cascade(caller).delete_video(id).await
    }

    pub async fn delete_track(&self, caller: &User, id: Uuid) -> Result<Track> {
        self.guard_delete::<Track>(caller, id).await?;
        self.cascade(caller).delete_track(id).await
    }

    pub async fn delete_annotation(&self, caller: &User, id: Uuid) -> Result<Annotation> {
        self.guard_delete::<Annotation>(caller, id).await?;
        self.cascade(caller).delete_annotation(id).await
    }

    pub async fn delete_comment(&self, caller: &User, id: Uuid) -> Result<Comment> {
        self.guard_delete::<Comment>(caller, id).await?;
        self.cascade(caller).delete_comment(id).await
    }

    pub async fn delete_scale(&self, caller: &User, id: Uuid) -> Result<Scale> {
        self.guard_delete::<Scale>(caller, id).await?;
        self.cascade(caller).delete_scale(id).await
    }

    pub async fn delete_scale_value(&self, caller: &User, id: Uuid) -> Result<ScaleValue> {
        self.guard_delete::<ScaleValue>(caller, id).await?;
        self.cascade(caller).delete_scale_value(id).await
    }

    pub async fn delete_category(&self, caller: &User, id: Uuid) -> Result<Category> {
        self.guard_delete::<Category>(caller, id).await?;
        self.cascade(caller).delete_category(id).await
    }

    pub async fn delete_label(&self, caller: &User, id: Uuid) -> Result<Label> {
        self.guard_delete::<Label>(caller, id).await?;
        self.cascade(caller).delete_label(id).await
    }

    fn cascade(&self, caller: &User) -> HierarchyCascade<'_> {
        HierarchyCascade::new(self.resources(caller))
    }

    /// Deleting needs access to the row, deleted or not, so a repeated
    /// delete is a no-op rather than an error.
    async fn guard_delete<E: Stored>(&self, caller: &User, id: Uuid) -> Result<()> {
        let entity = E::repository(self.dyn_store())
            .get(id, true)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} {}", E::KIND, id)))?;
        self.ensure_access(caller, &entity).await
    }

    // -------------------------------------------------------------------------
    // Guards
    // -------------------------------------------------------------------------

    async fn live<E: Stored>(&self, id: Uuid) -> Result<E> {
        E::repository(self.dyn_store())
            .get(id, false)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} {}", E::KIND, id)))
    }

    /// The parent of a new child must be live and visible.
    async fn require_parent<P: Stored>(&self, caller: &User, id: Uuid) -> Result<P> {
        let parent = match self.live::<P>(id).await {
            Ok(parent) => parent,
            Err(e) if e.is_not_found() => {
                return Err(Error::BadRequest(format!(
                    "{} {} does not exist",
                    P::KIND,
                    id
                )))
            }
            Err(e) => return Err(e),
        };
        self.ensure_access(caller, &parent).await?;
        Ok(parent)
    }

    /// An optional reference must point to a live row.
    async fn require_reference<R: Stored>(&self, id: Option<Uuid>) -> Result<Option<R>> {
        let Some(id) = id else {
            return Ok(None);
        };
        match self.live::<R>(id).await {
            Ok(row) => Ok(Some(row)),
            Err(e) if e.is_not_found() => Err(Error::BadRequest(format!(
                "referenced {} {} does not exist",
                R::KIND,
                id
            ))),
            Err(e) => Err(e),
        }
    }

    async fn ensure_access<E: Entity>(&self, caller: &User, entity: &E) -> Result<()> {
        let capability = self.capability_for(caller, entity).await?;
        self.check(caller, entity, capability)
    }

    fn check<E: Entity>(&self, caller: &User, entity: &E, capability: Capability) -> Result<()> {
        if has_access(entity.resource(), caller.id(), capability) {
            return Ok(());
        }
        debug!(
            subsystem = logging::SUBSYSTEM_ENGINE,
            component = logging::COMPONENT_SERVICE,
            op = "deny",
            entity = %E::KIND,
            entity_id = %entity.id(),
            user_id = %caller.id(),
            capability = %capability,
            "Access denied"
        );
        Err(Error::Unauthorized(format!(
            "{} {} is not accessible",
            E::KIND,
            entity.id()
        )))
    }

    /// Caller capability on the video owning `entity`.
    pub async fn capability_for<E: Entity>(&self, caller: &User, entity: &E) -> Result<Capability> {
        match self.owning_video(entity).await? {
            Some(video_id) => self.video_capability(caller, video_id).await,
            None => Ok(Capability::None),
        }
    }

    async fn video_capability(&self, caller: &User, video_id: Uuid) -> Result<Capability> {
        match self.store.videos().get(video_id, false).await? {
            Some(video) => Ok(self.videos.resolve(&video, caller).await?.capability),
            None => Ok(Capability::NotFound),
        }
    }

    /// Walk up the ownership tree to the video, if any.
    async fn owning_video<E: Entity>(&self, entity: &E) -> Result<Option<Uuid>> {
        let parent_id = entity.parent_id();
        match E::KIND {
            EntityKind::User => Ok(None),
            EntityKind::Video => Ok(Some(entity.id())),
            EntityKind::Track | EntityKind::Scale | EntityKind::Category => Ok(parent_id),
            EntityKind::Annotation => match parent_id {
                Some(track_id) => self.video_of_track(track_id).await,
                None => Ok(None),
            },
            EntityKind::Comment => {
                let Some(annotation_id) = parent_id else {
                    return Ok(None);
                };
                let annotation = self.store.annotations().get(annotation_id, true).await?;
                match annotation {
                    Some(annotation) => self.video_of_track(annotation.track_id).await,
                    None => Ok(None),
                }
            }
            EntityKind::ScaleValue => {
                let Some(scale_id) = parent_id else {
                    return Ok(None);
                };
                let scale = self.store.scales().get(scale_id, true).await?;
                Ok(scale.and_then(|s| s.video_id))
            }
            EntityKind::Label => {
                let Some(category_id) = parent_id else {
                    return Ok(None);
                };
                let category = self.store.categories().get(category_id, true).await?;
                Ok(category.and_then(|c| c.video_id))
            }
        }
    }

    async fn video_of_track(&self, track_id: Uuid) -> Result<Option<Uuid>> {
        let track = self.store.tracks().get(track_id, true).await?;
        Ok(track.map(|t| t.video_id))
    }
}
