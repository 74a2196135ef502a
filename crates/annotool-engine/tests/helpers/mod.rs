//! Test helpers for engine integration tests.
//!
//! Builds a service over the in-memory store and seeds common hierarchies.
#![allow(dead_code)]

use std::sync::Arc;

use annotool_core::{
    Annotation, Capability, Category, FixedVideoInterface, Label, Scale, ScaleValue, Track, User,
    Video,
};
use annotool_engine::memory::MemoryStore;
use annotool_engine::AnnotationService;

/// A service plus the operator it acts as.
pub struct Harness {
    pub service: AnnotationService<MemoryStore>,
    pub admin: User,
}

/// Every caller holds ADMIN on every video.
pub async fn harness() -> Harness {
    harness_with(Capability::Admin).await
}

/// Every caller holds `capability` on every video.
pub async fn harness_with(capability: Capability) -> Harness {
    let service = AnnotationService::new(
        MemoryStore::new(),
        Arc::new(FixedVideoInterface::new(capability)),
    );
    let admin = service
        .resolve_user("admin", Some("Admin"), None)
        .await
        .unwrap();
    Harness { service, admin }
}

impl Harness {
    pub fn store(&self) -> &MemoryStore {
        self.service.store()
    }

    pub async fn user(&self, ext_id: &str) -> User {
        self.service.resolve_user(ext_id, None, None).await.unwrap()
    }

    pub async fn video(&self, ext_id: &str) -> Video {
        self.service
            .create_video(&self.admin, Video::new(ext_id))
            .await
            .unwrap()
    }

    pub async fn track(&self, video: &Video, name: &str) -> Track {
        self.service
            .create_track(&self.admin, Track::new(video.resource.id, name))
            .await
            .unwrap()
    }

    pub async fn annotation(&self, track: &Track, start: f64) -> Annotation {
        self.service
            .create_annotation(&self.admin, Annotation::new(track.resource.id, start, "note"))
            .await
            .unwrap()
    }

    /// Template scale with `values` as (name, value, order).
    pub async fn template_scale(&self, name: &str, values: &[(&str, f64, i32)]) -> Scale {
        let scale = self
            .service
            .create_scale(&self.admin, Scale::template(name))
            .await
            .unwrap();
        for (value_name, value, order) in values {
            self.service
                .create_scale_value(
                    &self.admin,
                    ScaleValue::new(scale.resource.id, *value_name, *value, *order),
                )
                .await
                .unwrap();
        }
        scale
    }

    /// Series master on `video` with one label per (value, abbreviation).
    pub async fn master(
        &self,
        video: &Video,
        series_ext_id: &str,
        name: &str,
        labels: &[(&str, &str)],
    ) -> Category {
        let mut category = Category::for_video(video.resource.id, name);
        category.series_ext_id = Some(series_ext_id.to_string());
        let category = self
            .service
            .create_category(&self.admin, category)
            .await
            .unwrap();
        for (value, abbreviation) in labels {
            self.label(&category, value, abbreviation).await;
        }
        category
    }

    pub async fn label(&self, category: &Category, value: &str, abbreviation: &str) -> Label {
        self.service
            .create_label(
                &self.admin,
                Label::new(category.resource.id, value, abbreviation),
            )
            .await
            .unwrap()
    }
}
