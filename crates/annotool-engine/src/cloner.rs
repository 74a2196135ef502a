//! Instantiate video-local scales and categories from templates.
//!
//! A clone is a sequence of creates. The first failing step aborts the clone
//! as `Error::Server`; rows created before it are left in place.

use tracing::debug;
use uuid::Uuid;

use annotool_core::{
    logging, Category, Entity, Error, Label, ListQuery, Resource, Result, Scale, ScaleValue,
    Store,
};

use crate::resources::ResourceStore;

/// Copy of the envelope a clone starts from: access and tags only.
fn cloned_resource(source: &Resource) -> Resource {
    Resource {
        access: source.access,
        tags: source.tags.clone(),
        ..Resource::default()
    }
}

/// Copies templates, and series masters, into a video.
#[derive(Clone, Copy)]
pub struct TemplateCloner<'a> {
    resources: ResourceStore<'a>,
}

impl<'a> TemplateCloner<'a> {
    pub fn new(resources: ResourceStore<'a>) -> Self {
        Self { resources }
    }

    fn store(&self) -> &'a dyn Store {
        self.resources.store()
    }

    /// Create a scale on `video_id` copying the source scale and its values.
    pub async fn clone_scale(&self, video_id: Uuid, template_id: Uuid) -> Result<Scale> {
        let template = self
            .store()
            .scales()
            .get(template_id, false)
            .await
            .map_err(|e| Error::server(format!("load scale {}", template_id), e))?
            .ok_or_else(|| Error::Server(format!("template scale {} not found", template_id)))?;

        let scale = Scale {
            resource: cloned_resource(&template.resource),
            video_id: Some(video_id),
            name: template.name.clone(),
            description: template.description.clone(),
        };
        let scale = self
            .resources
            .create(self.store().scales(), scale)
            .await
            .map_err(|e| Error::server(format!("clone scale {}", template_id), e))?;

        let values = self
            .store()
            .scale_values()
            .list(&ListQuery::children_of(template_id))
            .await
            .map_err(|e| Error::server(format!("list values of scale {}", template_id), e))?;

        for value in &values {
            let copy = ScaleValue {
                resource: cloned_resource(&value.resource),
                scale_id: scale.id(),
                name: value.name.clone(),
                value: value.value,
                order: value.order,
            };
            self.resources
                .create(self.store().scale_values(), copy)
                .await
                .map_err(|e| Error::server(format!("clone scale value {}", value.id()), e))?;
        }

        debug!(
            subsystem = logging::SUBSYSTEM_ENGINE,
            component = logging::COMPONENT_CLONER,
            op = "clone_scale",
            video_id = %video_id,
            entity_id = %scale.id(),
            result_count = values.len(),
            "Scale cloned from template {}",
            template_id
        );
        Ok(scale)
    }

    /// Create a category on `video_id` copying the source category, its scale
    /// and its labels.
    ///
    /// With `series_category_id` set the clone is a series-linked instance: it
    /// points at the source's scale instead of a copy, and every label records
    /// the source label in `series_label_id`.
    pub async fn clone_category(
        &self,
        video_id: Uuid,
        template_id: Uuid,
        series_ext_id: Option<String>,
        series_category_id: Option<Uuid>,
    ) -> Result<Category> {
        let template = self
            .store()
            .categories()
            .get(template_id, false)
            .await
            .map_err(|e| Error::server(format!("load category {}", template_id), e))?
            .ok_or_else(|| {
                Error::Server(format!("template category {} not found", template_id))
            })?;

        // Series instances share the master's scale
        let scale_id = match template.scale_id {
            Some(scale_id) if series_category_id.is_some() => Some(scale_id),
            Some(scale_id) => Some(self.clone_scale(video_id, scale_id).await?.id()),
            None => None,
        };

        let category = Category {
            resource: cloned_resource(&template.resource),
            video_id: Some(video_id),
            scale_id,
            name: template.name.clone(),
            description: template.description.clone(),
            settings: template.settings.clone(),
            has_duration: template.has_duration,
            series_ext_id,
            series_category_id,
        };
        let category = self
            .resources
            .create(self.store().categories(), category)
            .await
            .map_err(|e| Error::server(format!("clone category {}", template_id), e))?;

        let labels = self
            .store()
            .labels()
            .list(&ListQuery::children_of(template_id))
            .await
            .map_err(|e| Error::server(format!("list labels of category {}", template_id), e))?;

        let link_labels = series_category_id.is_some();
        for label in &labels {
            let series_label_id = link_labels.then(|| label.id());
            self.clone_label(label, category.id(), series_label_id)
                .await?;
        }

        debug!(
            subsystem = logging::SUBSYSTEM_ENGINE,
            component = logging::COMPONENT_CLONER,
            op = "clone_category",
            video_id = %video_id,
            entity_id = %category.id(),
            result_count = labels.len(),
            "Category cloned from {}",
            template_id
        );
        Ok(category)
    }

    /// Create a copy of `label` in `category_id`.
    pub async fn clone_label(
        &self,
        label: &Label,
        category_id: Uuid,
        series_label_id: Option<Uuid>,
    ) -> Result<Label> {
        let copy = Label {
            resource: cloned_resource(&label.resource),
            category_id,
            value: label.value.clone(),
            abbreviation: label.abbreviation.clone(),
            description: label.description.clone(),
            settings: label.settings.clone(),
            series_label_id,
        };
        self.resources
            .create(self.store().labels(), copy)
            .await
            .map_err(|e| Error::server(format!("clone label {}", label.id()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use annotool_core::{new_v7, Access};

    #[test]
    fn test_cloned_resource_keeps_access_and_tags_only() {
        let mut source = Resource::with_access(Access::Public);
        source.id = new_v7();
        source.stamp_created(new_v7(), chrono::Utc::now());
        source.tags.insert("lang".to_string(), "de".to_string());

        let copy = cloned_resource(&source);
        assert!(copy.is_new());
        assert!(copy.created_by.is_none());
        assert_eq!(copy.access, Access::Public);
        assert_eq!(copy.tag("lang"), Some("de"));
    }

    #[tokio::test]
    async fn test_missing_template_is_server_error() {
        let store = MemoryStore::new();
        let cloner = TemplateCloner::new(ResourceStore::new(&store, new_v7()));
        let err = cloner.clone_scale(new_v7(), new_v7()).await.unwrap_err();
        assert!(matches!(err, Error::Server(_)));

        let err = cloner
            .clone_category(new_v7(), new_v7(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Server(_)));
    }
}
