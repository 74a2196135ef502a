//! Reconcile a video's categories against the masters of a series.
//!
//! A series is identified by an external id. Its masters are the categories
//! carrying that id whose `series_category_id` points at themselves. Syncing
//! a video guarantees one linked category per master on that video:
//!
//! 1. unlinked categories that already look like a master are linked to it;
//! 2. linked categories are brought in line with their master;
//! 3. masters without a linked category are cloned into the video.
//!
//! Labels of every linked category are mirrored from the master's labels.
//! Only rows whose mirrored fields differ are written, so syncing a converged
//! video writes nothing.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use annotool_core::{
    logging, Category, Entity, Error, Label, ListQuery, Result, Store,
};

use crate::cascade::HierarchyCascade;
use crate::cloner::TemplateCloner;
use crate::resources::ResourceStore;

/// Counts of what one sync changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub linked: usize,
    pub updated: usize,
    pub cloned: usize,
    pub labels_written: usize,
    pub labels_deleted: usize,
}

/// Name, description, settings and tags all equal.
///
/// The scale is not compared.
pub fn sufficiently_equal(category: &Category, master: &Category) -> bool {
    category.name == master.name
        && category.description == master.description
        && category.settings == master.settings
        && category.resource.tags == master.resource.tags
}

fn mirrors_master(category: &Category, master: &Category) -> bool {
    sufficiently_equal(category, master)
        && category.scale_id == master.scale_id
        && category.resource.access == master.resource.access
}

fn mirror_master(category: &mut Category, master: &Category) {
    category.scale_id = master.scale_id;
    category.name = master.name.clone();
    category.description = master.description.clone();
    category.settings = master.settings.clone();
    category.resource.tags = master.resource.tags.clone();
    category.resource.access = master.resource.access;
}

fn mirrors_label(label: &Label, master: &Label) -> bool {
    label.value == master.value
        && label.abbreviation == master.abbreviation
        && label.description == master.description
        && label.settings == master.settings
        && label.resource.access == master.resource.access
        && label.resource.tags == master.resource.tags
}

fn mirror_label(label: &mut Label, master: &Label) {
    label.value = master.value.clone();
    label.abbreviation = master.abbreviation.clone();
    label.description = master.description.clone();
    label.settings = master.settings.clone();
    label.resource.access = master.resource.access;
    label.resource.tags = master.resource.tags.clone();
}

/// Series reconciliation and master relocation.
#[derive(Clone, Copy)]
pub struct SeriesSync<'a> {
    resources: ResourceStore<'a>,
    cloner: TemplateCloner<'a>,
    cascade: HierarchyCascade<'a>,
}

impl<'a> SeriesSync<'a> {
    pub fn new(resources: ResourceStore<'a>) -> Self {
        Self {
            resources,
            cloner: TemplateCloner::new(resources),
            cascade: HierarchyCascade::new(resources),
        }
    }

    fn store(&self) -> &'a dyn Store {
        self.resources.store()
    }

    /// Live masters of the series, in id order.
    pub async fn masters(&self, series_ext_id: &str) -> Result<Vec<Category>> {
        let tagged = self
            .store()
            .categories()
            .find_by_series_ext_id(series_ext_id)
            .await?;
        Ok(tagged
            .into_iter()
            .filter(Category::is_series_master)
            .collect())
    }

    /// Bring the categories of `video_id` in line with the series and return
    /// the video's full live category set.
    pub async fn sync(&self, video_id: Uuid, series_ext_id: &str) -> Result<Vec<Category>> {
        let (categories, _) = self.sync_with_report(video_id, series_ext_id).await?;
        Ok(categories)
    }

    pub async fn sync_with_report(
        &self,
        video_id: Uuid,
        series_ext_id: &str,
    ) -> Result<(Vec<Category>, SyncReport)> {
        let start = Instant::now();
        let mut report = SyncReport::default();

        let masters = self
            .masters(series_ext_id)
            .await
            .map_err(|e| Error::server(format!("load series {}", series_ext_id), e))?;
        let mut on_video = self.video_categories(video_id).await?;

        // Link pre-existing categories that match a master
        let mut linked_masters: HashSet<Uuid> = on_video
            .iter()
            .filter_map(|c| c.series_category_id)
            .collect();
        for category in on_video.iter_mut() {
            if category.is_series_linked() {
                continue;
            }
            let Some(master) = masters
                .iter()
                .find(|m| !linked_masters.contains(&m.id()) && sufficiently_equal(category, m))
            else {
                continue;
            };

            let mut linked = category.clone();
            mirror_master(&mut linked, master);
            linked.series_ext_id = master.series_ext_id.clone();
            linked.series_category_id = Some(master.id());
            *category = self
                .resources
                .save(self.store().categories(), linked)
                .await
                .map_err(|e| Error::server(format!("link category {}", category.id()), e))?;

            linked_masters.insert(master.id());
            report.linked += 1;
            debug!(
                subsystem = logging::SUBSYSTEM_ENGINE,
                component = logging::COMPONENT_SERIES,
                op = "link",
                video_id = %video_id,
                entity_id = %category.id(),
                series_ext_id = %series_ext_id,
                "Category linked to series master {}",
                master.id()
            );
        }

        // One linked category per master
        for master in &masters {
            let existing = on_video
                .iter()
                .find(|c| c.series_category_id == Some(master.id()))
                .cloned();

            match existing {
                Some(category) if category.id() == master.id() => {}
                Some(mut category) => {
                    if !mirrors_master(&category, master) {
                        mirror_master(&mut category, master);
                        category = self
                            .resources
                            .save(self.store().categories(), category)
                            .await
                            .map_err(|e| {
                                Error::server(format!("update linked category {}", master.id()), e)
                            })?;
                        report.updated += 1;
                    }
                    self.sync_labels(master, &category, &mut report).await?;
                }
                None => {
                    self.cloner
                        .clone_category(
                            video_id,
                            master.id(),
                            master.series_ext_id.clone(),
                            Some(master.id()),
                        )
                        .await?;
                    report.cloned += 1;
                    debug!(
                        subsystem = logging::SUBSYSTEM_ENGINE,
                        component = logging::COMPONENT_SERIES,
                        op = "clone",
                        video_id = %video_id,
                        series_ext_id = %series_ext_id,
                        "Series master {} cloned into video",
                        master.id()
                    );
                }
            }
        }

        let categories = self.video_categories(video_id).await?;

        info!(
            subsystem = logging::SUBSYSTEM_ENGINE,
            component = logging::COMPONENT_SERIES,
            op = "sync",
            video_id = %video_id,
            series_ext_id = %series_ext_id,
            masters = masters.len(),
            linked = report.linked,
            updated = report.updated,
            cloned = report.cloned,
            labels_written = report.labels_written,
            labels_deleted = report.labels_deleted,
            result_count = categories.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Series sync finished"
        );
        Ok((categories, report))
    }

    /// Mirror the master's labels onto `target`.
    async fn sync_labels(
        &self,
        master: &Category,
        target: &Category,
        report: &mut SyncReport,
    ) -> Result<()> {
        let labels = self.store().labels();
        let master_labels = labels
            .list(&ListQuery::children_of(master.id()))
            .await
            .map_err(|e| Error::server(format!("list labels of master {}", master.id()), e))?;
        let mut target_labels = labels
            .list(&ListQuery::children_of(target.id()))
            .await
            .map_err(|e| Error::server(format!("list labels of category {}", target.id()), e))?;

        for master_label in &master_labels {
            let linked = target_labels
                .iter()
                .position(|l| l.series_label_id == Some(master_label.id()));
            let matching = || {
                target_labels.iter().position(|l| {
                    l.series_label_id.is_none()
                        && l.value == master_label.value
                        && l.abbreviation == master_label.abbreviation
                })
            };

            match linked.or_else(matching) {
                Some(idx) => {
                    let label = &target_labels[idx];
                    if label.series_label_id == Some(master_label.id())
                        && mirrors_label(label, master_label)
                    {
                        continue;
                    }
                    let mut label = label.clone();
                    mirror_label(&mut label, master_label);
                    label.series_label_id = Some(master_label.id());
                    target_labels[idx] = self
                        .resources
                        .save(labels, label)
                        .await
                        .map_err(|e| {
                            Error::server(format!("sync label {}", master_label.id()), e)
                        })?;
                }
                None => {
                    self.cloner
                        .clone_label(master_label, target.id(), Some(master_label.id()))
                        .await?;
                }
            }
            report.labels_written += 1;
        }

        let master_label_ids: HashSet<Uuid> = master_labels.iter().map(Label::id).collect();
        for stale in target_labels.iter().filter(|l| {
            l.series_label_id
                .is_some_and(|source| !master_label_ids.contains(&source))
        }) {
            self.resources
                .soft_delete(labels, stale.id())
                .await
                .map_err(|e| Error::server(format!("delete stale label {}", stale.id()), e))?;
            report.labels_deleted += 1;
        }
        Ok(())
    }

    /// Move `category` to `new_video_id`, first deleting every other category
    /// linked to the same series master.
    pub async fn update_category_and_delete_other_series_categories(
        &self,
        mut category: Category,
        new_video_id: Uuid,
    ) -> Result<Category> {
        let master_id = category.series_category_id.unwrap_or_else(|| category.id());
        let deleted = self
            .cascade
            .delete_linked_categories(master_id, category.id())
            .await?;

        category.video_id = Some(new_video_id);
        let category = self
            .resources
            .save(self.store().categories(), category)
            .await?;

        info!(
            subsystem = logging::SUBSYSTEM_ENGINE,
            component = logging::COMPONENT_SERIES,
            op = "relocate",
            video_id = %new_video_id,
            entity_id = %category.id(),
            result_count = deleted,
            "Series master relocated"
        );
        Ok(category)
    }

    async fn video_categories(&self, video_id: Uuid) -> Result<Vec<Category>> {
        self.store()
            .categories()
            .list(&ListQuery::children_of(video_id))
            .await
            .map_err(|e| Error::server(format!("list categories of video {}", video_id), e))
    }
}
