//! Scale and scale value table mappings.

use sqlx::postgres::PgRow;
use sqlx::Row;

use annotool_core::{Resource, Scale, ScaleValue};

use crate::repository::{ParentColumn, PgEntity, PgQuery, PgRepository};

pub type PgScaleRepository = PgRepository<Scale>;
pub type PgScaleValueRepository = PgRepository<ScaleValue>;

impl PgEntity for Scale {
    const TABLE: &'static str = "scales";
    const FIELD_COLUMNS: &'static [&'static str] = &["video_id", "name", "description"];
    const PARENT: ParentColumn = ParentColumn::TemplateAware("video_id");

    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.video_id)
            .bind(&self.name)
            .bind(&self.description)
    }

    fn from_row(row: &PgRow, resource: Resource) -> Self {
        Self {
            resource,
            video_id: row.get("video_id"),
            name: row.get("name"),
            description: row.get("description"),
        }
    }
}

impl PgEntity for ScaleValue {
    const TABLE: &'static str = "scale_values";
    // `order` is reserved in SQL
    const FIELD_COLUMNS: &'static [&'static str] = &["scale_id", "name", "value", "sort_order"];
    const PARENT: ParentColumn = ParentColumn::Required("scale_id");
    const ORDER_BY: &'static str = "sort_order, id";

    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.scale_id)
            .bind(&self.name)
            .bind(self.value)
            .bind(self.order)
    }

    fn from_row(row: &PgRow, resource: Resource) -> Self {
        Self {
            resource,
            scale_id: row.get("scale_id"),
            name: row.get("name"),
            value: row.get("value"),
            order: row.get("sort_order"),
        }
    }
}
