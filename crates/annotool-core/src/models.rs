//! Entity models for annotool.
//!
//! Ownership is a strict tree: Video → Track → Annotation → Comment,
//! Video → Category → Label and Video → Scale → ScaleValue. Categories and
//! Scales without a `video_id` are reusable templates. The only cross-video
//! relation is the non-owning `Category::series_category_id` link to a series
//! master.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resource::{Entity, EntityKind, Resource};

// =============================================================================
// USER / VIDEO
// =============================================================================

/// A user known to the annotation backend, keyed by the identity provider's id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub resource: Resource,
    /// External-system id, unique.
    pub ext_id: String,
    pub nickname: String,
    pub email: Option<String>,
}

impl User {
    pub fn new(ext_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            ext_id: ext_id.into(),
            nickname: nickname.into(),
            ..Self::default()
        }
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn resource(&self) -> &Resource {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    fn parent_id(&self) -> Option<Uuid> {
        None
    }

    fn apply_update(&mut self, changes: &Self) {
        self.resource.apply_update(&changes.resource);
        self.nickname = changes.nickname.clone();
        self.email = changes.email.clone();
    }
}

/// A video, keyed by the media platform's id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(flatten)]
    pub resource: Resource,
    /// External-system id, unique.
    pub ext_id: String,
}

impl Video {
    pub fn new(ext_id: impl Into<String>) -> Self {
        Self {
            ext_id: ext_id.into(),
            ..Self::default()
        }
    }
}

impl Entity for Video {
    const KIND: EntityKind = EntityKind::Video;

    fn resource(&self) -> &Resource {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    fn parent_id(&self) -> Option<Uuid> {
        None
    }

    fn apply_update(&mut self, changes: &Self) {
        self.resource.apply_update(&changes.resource);
    }
}

// =============================================================================
// TRACK / ANNOTATION / COMMENT
// =============================================================================

/// A named layer of annotations on a video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(flatten)]
    pub resource: Resource,
    pub video_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Opaque client settings.
    pub settings: Option<String>,
}

impl Track {
    pub fn new(video_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            video_id,
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Entity for Track {
    const KIND: EntityKind = EntityKind::Track;

    fn resource(&self) -> &Resource {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.video_id)
    }

    fn apply_update(&mut self, changes: &Self) {
        self.resource.apply_update(&changes.resource);
        self.name = changes.name.clone();
        self.description = changes.description.clone();
        self.settings = changes.settings.clone();
    }
}

/// A timed annotation on a track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(flatten)]
    pub resource: Resource,
    pub track_id: Uuid,
    /// Start position in seconds.
    pub start: f64,
    /// Length in seconds.
    pub duration: Option<f64>,
    /// Opaque client content.
    pub content: String,
    pub settings: Option<String>,
    pub label_id: Option<Uuid>,
    pub scale_value_id: Option<Uuid>,
    /// Id of the questionnaire category this annotation was created from.
    pub created_from_questionnaire: Option<Uuid>,
}

impl Annotation {
    pub fn new(track_id: Uuid, start: f64, content: impl Into<String>) -> Self {
        Self {
            track_id,
            start,
            content: content.into(),
            ..Self::default()
        }
    }
}

impl Entity for Annotation {
    const KIND: EntityKind = EntityKind::Annotation;

    fn resource(&self) -> &Resource {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.track_id)
    }

    fn apply_update(&mut self, changes: &Self) {
        self.resource.apply_update(&changes.resource);
        self.start = changes.start;
        self.duration = changes.duration;
        self.content = changes.content.clone();
        self.settings = changes.settings.clone();
        self.label_id = changes.label_id;
        self.scale_value_id = changes.scale_value_id;
        self.created_from_questionnaire = changes.created_from_questionnaire;
    }
}

/// A comment on an annotation, optionally replying to another comment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(flatten)]
    pub resource: Resource,
    pub annotation_id: Uuid,
    pub text: String,
    pub reply_to_id: Option<Uuid>,
}

impl Comment {
    pub fn new(annotation_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            annotation_id,
            text: text.into(),
            ..Self::default()
        }
    }

    /// A reply to `parent` on the same annotation.
    pub fn reply(parent: &Comment, text: impl Into<String>) -> Self {
        Self {
            annotation_id: parent.annotation_id,
            text: text.into(),
            reply_to_id: Some(parent.resource.id),
            ..Self::default()
        }
    }
}

impl Entity for Comment {
    const KIND: EntityKind = EntityKind::Comment;

    fn resource(&self) -> &Resource {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.annotation_id)
    }

    fn apply_update(&mut self, changes: &Self) {
        self.resource.apply_update(&changes.resource);
        self.text = changes.text.clone();
    }
}

// =============================================================================
// SCALE / SCALE VALUE
// =============================================================================

/// A rating scale; a template when `video_id` is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    #[serde(flatten)]
    pub resource: Resource,
    pub video_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
}

impl Scale {
    pub fn template(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn for_video(video_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            video_id: Some(video_id),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_template(&self) -> bool {
        self.video_id.is_none()
    }
}

impl Entity for Scale {
    const KIND: EntityKind = EntityKind::Scale;

    fn resource(&self) -> &Resource {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.video_id
    }

    fn apply_update(&mut self, changes: &Self) {
        self.resource.apply_update(&changes.resource);
        self.name = changes.name.clone();
        self.description = changes.description.clone();
    }
}

/// One point on a scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleValue {
    #[serde(flatten)]
    pub resource: Resource,
    pub scale_id: Uuid,
    pub name: String,
    pub value: f64,
    /// Display position; not required to be unique.
    pub order: i32,
}

impl ScaleValue {
    pub fn new(scale_id: Uuid, name: impl Into<String>, value: f64, order: i32) -> Self {
        Self {
            scale_id,
            name: name.into(),
            value,
            order,
            ..Self::default()
        }
    }
}

impl Entity for ScaleValue {
    const KIND: EntityKind = EntityKind::ScaleValue;

    fn resource(&self) -> &Resource {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.scale_id)
    }

    fn apply_update(&mut self, changes: &Self) {
        self.resource.apply_update(&changes.resource);
        self.name = changes.name.clone();
        self.value = changes.value;
        self.order = changes.order;
    }
}

// =============================================================================
// CATEGORY / LABEL
// =============================================================================

/// A label category; a template when `video_id` is absent.
///
/// Series relations:
/// - `series_ext_id` is set on a series master and carried by its clones.
/// - `series_category_id` links a category to its series master. A master
///   links to itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(flatten)]
    pub resource: Resource,
    pub video_id: Option<Uuid>,
    pub scale_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub settings: Option<String>,
    #[serde(default = "default_has_duration")]
    pub has_duration: bool,
    pub series_ext_id: Option<String>,
    pub series_category_id: Option<Uuid>,
}

fn default_has_duration() -> bool {
    true
}

impl Default for Category {
    fn default() -> Self {
        Self {
            resource: Resource::default(),
            video_id: None,
            scale_id: None,
            name: String::new(),
            description: None,
            settings: None,
            has_duration: true,
            series_ext_id: None,
            series_category_id: None,
        }
    }
}

impl Category {
    pub fn template(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn for_video(video_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            video_id: Some(video_id),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_template(&self) -> bool {
        self.video_id.is_none()
    }

    /// A master links to itself.
    pub fn is_series_master(&self) -> bool {
        !self.resource.is_new() && self.series_category_id == Some(self.resource.id)
    }

    pub fn is_series_linked(&self) -> bool {
        self.series_category_id.is_some()
    }
}

impl Entity for Category {
    const KIND: EntityKind = EntityKind::Category;

    fn resource(&self) -> &Resource {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.video_id
    }

    fn apply_update(&mut self, changes: &Self) {
        self.resource.apply_update(&changes.resource);
        self.scale_id = changes.scale_id;
        self.name = changes.name.clone();
        self.description = changes.description.clone();
        self.settings = changes.settings.clone();
        self.has_duration = changes.has_duration;
        self.series_ext_id = changes.series_ext_id.clone();
        self.series_category_id = changes.series_category_id;
    }
}

/// A label inside a category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(flatten)]
    pub resource: Resource,
    pub category_id: Uuid,
    pub value: String,
    pub abbreviation: String,
    pub description: Option<String>,
    pub settings: Option<String>,
    /// The series label this one was cloned from.
    pub series_label_id: Option<Uuid>,
}

impl Label {
    pub fn new(
        category_id: Uuid,
        value: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> Self {
        Self {
            category_id,
            value: value.into(),
            abbreviation: abbreviation.into(),
            ..Self::default()
        }
    }
}

impl Entity for Label {
    const KIND: EntityKind = EntityKind::Label;

    fn resource(&self) -> &Resource {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.category_id)
    }

    fn apply_update(&mut self, changes: &Self) {
        self.resource.apply_update(&changes.resource);
        self.value = changes.value.clone();
        self.abbreviation = changes.abbreviation.clone();
        self.description = changes.description.clone();
        self.settings = changes.settings.clone();
        self.series_label_id = changes.series_label_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_default_has_duration() {
        assert!(Category::default().has_duration);
        let parsed: Category = serde_json::from_str(r#"{"id":"00000000-0000-0000-0000-000000000000","name":"Behavior","video_id":null,"scale_id":null,"description":null,"settings":null,"series_ext_id":null,"series_category_id":null,"created_by":null,"updated_by":null,"deleted_by":null,"created_at":null,"updated_at":null,"deleted_at":null}"#).unwrap();
        assert!(parsed.has_duration);
        assert_eq!(parsed.name, "Behavior");
    }

    #[test]
    fn test_category_series_master_is_self_linked() {
        let mut category = Category::template("Behavior");
        assert!(!category.is_series_master());

        let id = Uuid::now_v7();
        category.resource.id = id;
        category.series_ext_id = Some("courseA".to_string());
        category.series_category_id = Some(id);
        assert!(category.is_series_master());
        assert!(category.is_series_linked());

        category.series_category_id = Some(Uuid::now_v7());
        assert!(!category.is_series_master());
        assert!(category.is_series_linked());
    }

    #[test]
    fn test_track_update_keeps_video() {
        let video_id = Uuid::now_v7();
        let mut live = Track::new(video_id, "Default");
        let mut changes = Track::new(Uuid::now_v7(), "Renamed");
        changes.description = Some("notes".to_string());

        live.apply_update(&changes);
        assert_eq!(live.video_id, video_id);
        assert_eq!(live.name, "Renamed");
        assert_eq!(live.description.as_deref(), Some("notes"));
    }

    #[test]
    fn test_category_update_keeps_video() {
        let video_id = Uuid::now_v7();
        let mut live = Category::for_video(video_id, "Behavior");
        let changes = Category::for_video(Uuid::now_v7(), "Mood");

        live.apply_update(&changes);
        assert_eq!(live.video_id, Some(video_id));
        assert_eq!(live.name, "Mood");
    }

    #[test]
    fn test_comment_reply_points_to_parent() {
        let mut parent = Comment::new(Uuid::now_v7(), "first");
        parent.resource.id = Uuid::now_v7();
        let reply = Comment::reply(&parent, "second");
        assert_eq!(reply.reply_to_id, Some(parent.resource.id));
        assert_eq!(reply.annotation_id, parent.annotation_id);
    }

    #[test]
    fn test_parent_ids() {
        let video_id = Uuid::now_v7();
        assert_eq!(Track::new(video_id, "t").parent_id(), Some(video_id));
        assert_eq!(Scale::template("s").parent_id(), None);
        assert_eq!(Scale::for_video(video_id, "s").parent_id(), Some(video_id));
        assert_eq!(Video::new("lecture1").parent_id(), None);
    }
}
