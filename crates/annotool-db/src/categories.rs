//! Category and label table mappings, including the series lookups.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use annotool_core::{Category, CategoryRepository, Label, Resource, Result};

use crate::repository::{ParentColumn, PgEntity, PgQuery, PgRepository};

/// PostgreSQL implementation of CategoryRepository.
pub type PgCategoryRepository = PgRepository<Category>;
pub type PgLabelRepository = PgRepository<Label>;

impl PgEntity for Category {
    const TABLE: &'static str = "categories";
    const FIELD_COLUMNS: &'static [&'static str] = &[
        "video_id",
        "scale_id",
        "name",
        "description",
        "settings",
        "has_duration",
        "series_ext_id",
        "series_category_id",
    ];
    const PARENT: ParentColumn = ParentColumn::TemplateAware("video_id");

    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.video_id)
            .bind(self.scale_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(&self.settings)
            .bind(self.has_duration)
            .bind(&self.series_ext_id)
            .bind(self.series_category_id)
    }

    fn from_row(row: &PgRow, resource: Resource) -> Self {
        Self {
            resource,
            video_id: row.get("video_id"),
            scale_id: row.get("scale_id"),
            name: row.get("name"),
            description: row.get("description"),
            settings: row.get("settings"),
            has_duration: row.get("has_duration"),
            series_ext_id: row.get("series_ext_id"),
            series_category_id: row.get("series_category_id"),
        }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn find_by_series_ext_id(&self, series_ext_id: &str) -> Result<Vec<Category>> {
        self.fetch_live_by_text("series_ext_id = $1", series_ext_id)
            .await
    }

    async fn find_by_series_category_id(
        &self,
        series_category_id: Uuid,
    ) -> Result<Vec<Category>> {
        self.fetch_live_by_id("series_category_id = $1", series_category_id)
            .await
    }
}

impl PgEntity for Label {
    const TABLE: &'static str = "labels";
    const FIELD_COLUMNS: &'static [&'static str] = &[
        "category_id",
        "value",
        "abbreviation",
        "description",
        "settings",
        "series_label_id",
    ];
    const PARENT: ParentColumn = ParentColumn::Required("category_id");

    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.category_id)
            .bind(&self.value)
            .bind(&self.abbreviation)
            .bind(&self.description)
            .bind(&self.settings)
            .bind(self.series_label_id)
    }

    fn from_row(row: &PgRow, resource: Resource) -> Self {
        Self {
            resource,
            category_id: row.get("category_id"),
            value: row.get("value"),
            abbreviation: row.get("abbreviation"),
            description: row.get("description"),
            settings: row.get("settings"),
            series_label_id: row.get("series_label_id"),
        }
    }
}
