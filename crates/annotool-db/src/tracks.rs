//! Track, annotation and comment table mappings.

use sqlx::postgres::PgRow;
use sqlx::Row;

use annotool_core::{Annotation, Comment, Resource, Track};

use crate::repository::{ParentColumn, PgEntity, PgQuery, PgRepository};

pub type PgTrackRepository = PgRepository<Track>;
pub type PgAnnotationRepository = PgRepository<Annotation>;
pub type PgCommentRepository = PgRepository<Comment>;

impl PgEntity for Track {
    const TABLE: &'static str = "tracks";
    const FIELD_COLUMNS: &'static [&'static str] = &["video_id", "name", "description", "settings"];
    const PARENT: ParentColumn = ParentColumn::Required("video_id");

    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.video_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(&self.settings)
    }

    fn from_row(row: &PgRow, resource: Resource) -> Self {
        Self {
            resource,
            video_id: row.get("video_id"),
            name: row.get("name"),
            description: row.get("description"),
            settings: row.get("settings"),
        }
    }
}

impl PgEntity for Annotation {
    const TABLE: &'static str = "annotations";
    const FIELD_COLUMNS: &'static [&'static str] = &[
        "track_id",
        "start_secs",
        "duration_secs",
        "content",
        "settings",
        "label_id",
        "scale_value_id",
        "created_from_questionnaire",
    ];
    const PARENT: ParentColumn = ParentColumn::Required("track_id");

    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.track_id)
            .bind(self.start)
            .bind(self.duration)
            .bind(&self.content)
            .bind(&self.settings)
            .bind(self.label_id)
            .bind(self.scale_value_id)
            .bind(self.created_from_questionnaire)
    }

    fn from_row(row: &PgRow, resource: Resource) -> Self {
        Self {
            resource,
            track_id: row.get("track_id"),
            start: row.get("start_secs"),
            duration: row.get("duration_secs"),
            content: row.get("content"),
            settings: row.get("settings"),
            label_id: row.get("label_id"),
            scale_value_id: row.get("scale_value_id"),
            created_from_questionnaire: row.get("created_from_questionnaire"),
        }
    }
}

impl PgEntity for Comment {
    const TABLE: &'static str = "comments";
    const FIELD_COLUMNS: &'static [&'static str] = &["annotation_id", "text", "reply_to_id"];
    const PARENT: ParentColumn = ParentColumn::Required("annotation_id");

    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.annotation_id)
            .bind(&self.text)
            .bind(self.reply_to_id)
    }

    fn from_row(row: &PgRow, resource: Resource) -> Self {
        Self {
            resource,
            annotation_id: row.get("annotation_id"),
            text: row.get("text"),
            reply_to_id: row.get("reply_to_id"),
        }
    }
}
