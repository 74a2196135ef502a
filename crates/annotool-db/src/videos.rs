//! Video table mapping and lookup by external id.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use annotool_core::{Resource, Result, Video, VideoRepository};

use crate::repository::{ParentColumn, PgEntity, PgQuery, PgRepository};

/// PostgreSQL implementation of VideoRepository.
pub type PgVideoRepository = PgRepository<Video>;

impl PgEntity for Video {
    const TABLE: &'static str = "videos";
    const FIELD_COLUMNS: &'static [&'static str] = &["ext_id"];
    const PARENT: ParentColumn = ParentColumn::None;

    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(&self.ext_id)
    }

    fn from_row(row: &PgRow, resource: Resource) -> Self {
        Self {
            resource,
            ext_id: row.get("ext_id"),
        }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn find_by_ext_id(&self, ext_id: &str) -> Result<Option<Video>> {
        let videos = self.fetch_live_by_text("ext_id = $1", ext_id).await?;
        Ok(videos.into_iter().next())
    }
}
