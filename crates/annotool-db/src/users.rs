//! User table mapping and lookup by external id.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use annotool_core::{Resource, Result, User, UserRepository};

use crate::repository::{ParentColumn, PgEntity, PgQuery, PgRepository};

/// PostgreSQL implementation of UserRepository.
pub type PgUserRepository = PgRepository<User>;

impl PgEntity for User {
    const TABLE: &'static str = "users";
    const FIELD_COLUMNS: &'static [&'static str] = &["ext_id", "nickname", "email"];
    const PARENT: ParentColumn = ParentColumn::None;

    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.ext_id)
            .bind(&self.nickname)
            .bind(&self.email)
    }

    fn from_row(row: &PgRow, resource: Resource) -> Self {
        Self {
            resource,
            ext_id: row.get("ext_id"),
            nickname: row.get("nickname"),
            email: row.get("email"),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_ext_id(&self, ext_id: &str) -> Result<Option<User>> {
        let users = self.fetch_live_by_text("ext_id = $1", ext_id).await?;
        Ok(users.into_iter().next())
    }
}
