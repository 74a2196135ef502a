//! Audit-stamping CRUD over any repository.
//!
//! Repositories persist exactly what they are given; this layer assigns ids
//! and the created/updated/deleted stamps for the acting user.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use annotool_core::{logging, new_v7, Entity, Error, Repository, Result, Store};

/// CRUD for one acting user.
#[derive(Clone, Copy)]
pub struct ResourceStore<'a> {
    store: &'a dyn Store,
    acting_user: Uuid,
}

impl<'a> ResourceStore<'a> {
    pub fn new(store: &'a dyn Store, acting_user: Uuid) -> Self {
        Self { store, acting_user }
    }

    pub fn store(&self) -> &'a dyn Store {
        self.store
    }

    pub fn acting_user(&self) -> Uuid {
        self.acting_user
    }

    /// Insert `entity` with a fresh audit envelope.
    ///
    /// A pre-assigned id is kept; a nil id gets a new UUIDv7. Access and tags
    /// are taken from the entity as supplied.
    pub async fn create<E, R>(&self, repo: &R, mut entity: E) -> Result<E>
    where
        E: Entity,
        R: Repository<E> + ?Sized,
    {
        let resource = entity.resource_mut();
        if resource.is_new() {
            resource.id = new_v7();
        }
        resource.updated_by = None;
        resource.updated_at = None;
        resource.deleted_by = None;
        resource.deleted_at = None;
        resource.stamp_created(self.acting_user, Utc::now());

        repo.insert(&entity).await?;

        debug!(
            subsystem = logging::SUBSYSTEM_ENGINE,
            component = logging::COMPONENT_RESOURCES,
            op = "create",
            entity = %E::KIND,
            entity_id = %entity.id(),
            "Resource created"
        );
        Ok(entity)
    }

    /// Apply the caller-mutable fields of `changes` to the live row with the
    /// same id.
    pub async fn update<E, R>(&self, repo: &R, changes: &E) -> Result<E>
    where
        E: Entity,
        R: Repository<E> + ?Sized,
    {
        let mut live = self.get_live(repo, changes.id()).await?;
        live.apply_update(changes);
        self.save(repo, live).await
    }

    /// Persist `entity` as given, stamping the update.
    ///
    /// For engine-driven changes outside the caller-mutable set, such as
    /// moving a category or linking it to a series.
    pub async fn save<E, R>(&self, repo: &R, mut entity: E) -> Result<E>
    where
        E: Entity,
        R: Repository<E> + ?Sized,
    {
        entity
            .resource_mut()
            .stamp_updated(self.acting_user, Utc::now());
        repo.update(&entity).await?;

        debug!(
            subsystem = logging::SUBSYSTEM_ENGINE,
            component = logging::COMPONENT_RESOURCES,
            op = "update",
            entity = %E::KIND,
            entity_id = %entity.id(),
            "Resource updated"
        );
        Ok(entity)
    }

    /// Live row or `NotFound`.
    pub async fn get_live<E, R>(&self, repo: &R, id: Uuid) -> Result<E>
    where
        E: Entity,
        R: Repository<E> + ?Sized,
    {
        repo.get(id, false)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} {}", E::KIND, id)))
    }

    /// Stamp the row as deleted.
    ///
    /// Deleting an already deleted row returns it unchanged. A row that never
    /// existed is `NotFound`.
    pub async fn soft_delete<E, R>(&self, repo: &R, id: Uuid) -> Result<E>
    where
        E: Entity,
        R: Repository<E> + ?Sized,
    {
        let mut entity = repo
            .get(id, true)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} {}", E::KIND, id)))?;

        if entity.resource().is_deleted() {
            debug!(
                subsystem = logging::SUBSYSTEM_ENGINE,
                component = logging::COMPONENT_RESOURCES,
                op = "delete",
                entity = %E::KIND,
                entity_id = %id,
                "Resource already deleted"
            );
            return Ok(entity);
        }

        entity
            .resource_mut()
            .stamp_deleted(self.acting_user, Utc::now());
        repo.update(&entity).await?;

        debug!(
            subsystem = logging::SUBSYSTEM_ENGINE,
            component = logging::COMPONENT_RESOURCES,
            op = "delete",
            entity = %E::KIND,
            entity_id = %id,
            "Resource deleted"
        );
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use annotool_core::{Access, Track, Video};

    #[tokio::test]
    async fn test_create_assigns_id_and_creator() {
        let store = MemoryStore::new();
        let user = new_v7();
        let rs = ResourceStore::new(&store, user);

        let mut video = Video::new("lecture1");
        video.resource.access = Access::Public;
        let video = rs.create(store.videos(), video).await.unwrap();

        assert!(!video.resource.is_new());
        assert_eq!(video.resource.created_by, Some(user));
        assert!(video.resource.created_at.is_some());
        assert_eq!(video.resource.access, Access::Public);
    }

    #[tokio::test]
    async fn test_create_keeps_preassigned_id() {
        let store = MemoryStore::new();
        let rs = ResourceStore::new(&store, new_v7());
        let id = new_v7();
        let mut video = Video::new("lecture1");
        video.resource.id = id;
        let video = rs.create(store.videos(), video).await.unwrap();
        assert_eq!(video.id(), id);
    }

    #[tokio::test]
    async fn test_update_requires_live_row() {
        let store = MemoryStore::new();
        let rs = ResourceStore::new(&store, new_v7());
        let video = rs
            .create(store.videos(), Video::new("lecture1"))
            .await
            .unwrap();
        let track = rs
            .create(store.tracks(), Track::new(video.id(), "Default"))
            .await
            .unwrap();
        rs.soft_delete(store.tracks(), track.id()).await.unwrap();

        let err = rs.update(store.tracks(), &track).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_soft_delete_is_idempotent() {
        let store = MemoryStore::new();
        let first = new_v7();
        let video = ResourceStore::new(&store, first)
            .create(store.videos(), Video::new("lecture1"))
            .await
            .unwrap();

        let deleted = ResourceStore::new(&store, first)
            .soft_delete(store.videos(), video.id())
            .await
            .unwrap();
        let again = ResourceStore::new(&store, new_v7())
            .soft_delete(store.videos(), video.id())
            .await
            .unwrap();

        assert_eq!(again.resource.deleted_at, deleted.resource.deleted_at);
        assert_eq!(again.resource.deleted_by, Some(first));
    }

    #[tokio::test]
    async fn test_soft_delete_unknown_is_not_found() {
        let store = MemoryStore::new();
        let rs = ResourceStore::new(&store, new_v7());
        let err = rs
            .soft_delete::<Video, _>(store.videos(), new_v7())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
