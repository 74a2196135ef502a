//! Cascading soft delete down the ownership tree.
//!
//! Video → Track → Annotation → Comment, Video → Category → Label and
//! Video → Scale → ScaleValue. Each level lists the live children of the
//! parent and soft-deletes them one by one through [`ResourceStore`], so every
//! child gets its own audit stamp. A series master category additionally takes
//! down every category linked to it, on any video.
//!
//! Children that turn out to be gone already are skipped. Any other failure
//! aborts the cascade as `Error::Server`; rows deleted before the failure stay
//! deleted.

use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use annotool_core::{
    logging, Annotation, Category, Comment, Entity, EntityKind, Error, Label, ListQuery,
    Repository, Result, Scale, ScaleValue, Store, Track, Video,
};

use crate::resources::ResourceStore;

/// Soft-deletes entities together with everything they own.
#[derive(Clone, Copy)]
pub struct HierarchyCascade<'a> {
    resources: ResourceStore<'a>,
}

impl<'a> HierarchyCascade<'a> {
    pub fn new(resources: ResourceStore<'a>) -> Self {
        Self { resources }
    }

    fn store(&self) -> &'a dyn Store {
        self.resources.store()
    }

    // =========================================================================
    // ENTRY POINTS
    // =========================================================================

    /// Delete a video with its tracks, categories and scales.
    pub async fn delete_video(&self, id: Uuid) -> Result<Video> {
        let start = Instant::now();
        let video = self.resources.soft_delete(self.store().videos(), id).await?;

        for track in self.live_children(self.store().tracks(), id).await? {
            let result = self.track_subtree(track.id()).await;
            self.skip_missing(EntityKind::Track, track.id(), result)?;
        }
        for category in self.live_children(self.store().categories(), id).await? {
            let result = self.delete_category(category.id()).await;
            self.skip_missing(EntityKind::Category, category.id(), result)?;
        }
        for scale in self.live_children(self.store().scales(), id).await? {
            let result = self.scale_subtree(scale.id()).await;
            self.skip_missing(EntityKind::Scale, scale.id(), result)?;
        }

        info!(
            subsystem = logging::SUBSYSTEM_ENGINE,
            component = logging::COMPONENT_CASCADE,
            op = "delete_video",
            video_id = %id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Video cascade finished"
        );
        Ok(video)
    }

    pub async fn delete_track(&self, id: Uuid) -> Result<Track> {
        self.track_subtree(id).await
    }

    pub async fn delete_annotation(&self, id: Uuid) -> Result<Annotation> {
        self.annotation_subtree(id).await
    }

    pub async fn delete_comment(&self, id: Uuid) -> Result<Comment> {
        self.resources.soft_delete(self.store().comments(), id).await
    }

    pub async fn delete_scale(&self, id: Uuid) -> Result<Scale> {
        self.scale_subtree(id).await
    }

    pub async fn delete_scale_value(&self, id: Uuid) -> Result<ScaleValue> {
        self.resources
            .soft_delete(self.store().scale_values(), id)
            .await
    }

    pub async fn delete_label(&self, id: Uuid) -> Result<Label> {
        self.resources.soft_delete(self.store().labels(), id).await
    }

    /// Delete a category with its labels.
    ///
    /// A series master also takes down every category linked to it, across
    /// all videos. Those linked categories lose their labels but do not fan
    /// out further.
    pub async fn delete_category(&self, id: Uuid) -> Result<Category> {
        let category = self.category_subtree(id).await?;

        if category.is_series_master() || category.series_ext_id.is_some() {
            let linked = self
                .store()
                .categories()
                .find_by_series_category_id(id)
                .await
                .map_err(|e| Error::server(format!("list categories linked to {}", id), e))?;
            let fan_out = linked.iter().filter(|c| c.id() != id).count();
            for other in linked.into_iter().filter(|c| c.id() != id) {
                let result = self.category_subtree(other.id()).await;
                self.skip_missing(EntityKind::Category, other.id(), result)?;
            }
            if fan_out > 0 {
                info!(
                    subsystem = logging::SUBSYSTEM_ENGINE,
                    component = logging::COMPONENT_CASCADE,
                    op = "delete_series_master",
                    entity_id = %id,
                    result_count = fan_out,
                    "Deleted categories linked to series master"
                );
            }
        }
        Ok(category)
    }

    /// Delete every category linked to `master_id` except `keep`, with their
    /// labels.
    pub async fn delete_linked_categories(&self, master_id: Uuid, keep: Uuid) -> Result<usize> {
        let linked = self
            .store()
            .categories()
            .find_by_series_category_id(master_id)
            .await
            .map_err(|e| Error::server(format!("list categories linked to {}", master_id), e))?;

        let mut deleted = 0;
        for other in linked.into_iter().filter(|c| c.id() != keep) {
            let result = self.category_subtree(other.id()).await;
            self.skip_missing(EntityKind::Category, other.id(), result)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    // =========================================================================
    // SUBTREES
    // =========================================================================

    async fn track_subtree(&self, id: Uuid) -> Result<Track> {
        let track = self.resources.soft_delete(self.store().tracks(), id).await?;
        for annotation in self.live_children(self.store().annotations(), id).await? {
            let result = self.annotation_subtree(annotation.id()).await;
            self.skip_missing(EntityKind::Annotation, annotation.id(), result)?;
        }
        Ok(track)
    }

    async fn annotation_subtree(&self, id: Uuid) -> Result<Annotation> {
        let annotation = self
            .resources
            .soft_delete(self.store().annotations(), id)
            .await?;
        for comment in self.live_children(self.store().comments(), id).await? {
            let result = self
                .resources
                .soft_delete(self.store().comments(), comment.id())
                .await;
            self.skip_missing(EntityKind::Comment, comment.id(), result)?;
        }
        Ok(annotation)
    }

    async fn category_subtree(&self, id: Uuid) -> Result<Category> {
        let category = self
            .resources
            .soft_delete(self.store().categories(), id)
            .await?;
        for label in self.live_children(self.store().labels(), id).await? {
            let result = self
                .resources
                .soft_delete(self.store().labels(), label.id())
                .await;
            self.skip_missing(EntityKind::Label, label.id(), result)?;
        }
        Ok(category)
    }

    async fn scale_subtree(&self, id: Uuid) -> Result<Scale> {
        let scale = self.resources.soft_delete(self.store().scales(), id).await?;
        for value in self.live_children(self.store().scale_values(), id).await? {
            let result = self
                .resources
                .soft_delete(self.store().scale_values(), value.id())
                .await;
            self.skip_missing(EntityKind::ScaleValue, value.id(), result)?;
        }
        Ok(scale)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    async fn live_children<E, R>(&self, repo: &R, parent_id: Uuid) -> Result<Vec<E>>
    where
        E: Entity,
        R: Repository<E> + ?Sized,
    {
        repo.list(&ListQuery::children_of(parent_id))
            .await
            .map_err(|e| Error::server(format!("list {} children of {}", E::KIND, parent_id), e))
    }

    /// Treat a child that is already gone as done; wrap anything else.
    fn skip_missing<T>(&self, kind: EntityKind, id: Uuid, result: Result<T>) -> Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(
                    subsystem = logging::SUBSYSTEM_ENGINE,
                    component = logging::COMPONENT_CASCADE,
                    op = "skip",
                    entity = %kind,
                    entity_id = %id,
                    "Child already gone, skipping"
                );
                Ok(())
            }
            Err(e) => Err(Error::server(format!("cascade delete {} {}", kind, id), e)),
        }
    }
}
