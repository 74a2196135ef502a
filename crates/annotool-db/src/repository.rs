//! Generic PostgreSQL repository shared by every entity table.
//!
//! All tables carry the same resource columns. An entity describes its own
//! columns and binding through [`PgEntity`]; [`PgRepository`] builds the SQL.
//! Inserts and updates bind in the same order: `id` as `$1`, the remaining
//! resource columns, then the entity columns.

use std::marker::PhantomData;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use annotool_core::{
    defaults, logging, Entity, EntityKind, Error, ListQuery, Repository, Resource, Result, Tags,
};

/// A query with positional PostgreSQL arguments.
pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Columns of the resource envelope, in binding order.
pub const RESOURCE_COLUMNS: &[&str] = &[
    "id",
    "access",
    "created_by",
    "updated_by",
    "deleted_by",
    "created_at",
    "updated_at",
    "deleted_at",
    "tags",
];

/// How a table references its owning parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentColumn {
    /// Top-level table.
    None,
    /// Parent column is NOT NULL.
    Required(&'static str),
    /// Parent column is nullable; a NULL parent marks a template.
    TemplateAware(&'static str),
}

/// Table mapping for one entity kind.
pub trait PgEntity: Entity {
    const TABLE: &'static str;

    /// Entity columns after the resource columns, in binding order.
    const FIELD_COLUMNS: &'static [&'static str];

    const PARENT: ParentColumn;

    const ORDER_BY: &'static str = "id";

    /// Bind the entity columns in `FIELD_COLUMNS` order.
    fn bind_fields<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;

    /// Build the entity from a row selected with [`select_columns`].
    fn from_row(row: &PgRow, resource: Resource) -> Self;
}

// =============================================================================
// SQL BUILDING
// =============================================================================

fn all_columns<E: PgEntity>() -> impl Iterator<Item = &'static str> {
    RESOURCE_COLUMNS
        .iter()
        .chain(E::FIELD_COLUMNS.iter())
        .copied()
}

/// Comma separated select list for `E`.
pub fn select_columns<E: PgEntity>() -> String {
    all_columns::<E>().collect::<Vec<_>>().join(", ")
}

pub(crate) fn insert_sql<E: PgEntity>() -> String {
    let columns: Vec<&str> = all_columns::<E>().collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        columns.join(", "),
        placeholders.join(", ")
    )
}

pub(crate) fn update_sql<E: PgEntity>() -> String {
    let assignments: Vec<String> = all_columns::<E>()
        .enumerate()
        .skip(1)
        .map(|(i, column)| format!("{} = ${}", column, i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE id = $1",
        E::TABLE,
        assignments.join(", ")
    )
}

/// `SELECT` of live rows matching `condition`, which may use `$1`.
pub(crate) fn select_live_sql<E: PgEntity>(condition: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} AND deleted_at IS NULL ORDER BY {}",
        select_columns::<E>(),
        E::TABLE,
        condition,
        E::ORDER_BY
    )
}

pub(crate) fn get_sql<E: PgEntity>(include_deleted: bool) -> String {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE id = $1",
        select_columns::<E>(),
        E::TABLE
    );
    if !include_deleted {
        sql.push_str(" AND deleted_at IS NULL");
    }
    sql
}

pub(crate) fn list_sql<E: PgEntity>(query: &ListQuery) -> String {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE TRUE",
        select_columns::<E>(),
        E::TABLE
    );
    let mut param = 1;

    match (E::PARENT, query.parent_id) {
        (ParentColumn::Required(column) | ParentColumn::TemplateAware(column), Some(_)) => {
            sql.push_str(&format!(" AND {} = ${}", column, param));
            param += 1;
        }
        (ParentColumn::TemplateAware(column), None) => {
            sql.push_str(&format!(" AND {} IS NULL", column));
        }
        _ => {}
    }

    if !query.include_deleted {
        sql.push_str(" AND deleted_at IS NULL");
    }

    if query.since.is_some() {
        sql.push_str(&format!(
            " AND COALESCE(updated_at, created_at) >= ${}",
            param
        ));
        param += 1;
    }

    sql.push_str(&format!(" ORDER BY {}", E::ORDER_BY));

    if query.limit.is_some() {
        sql.push_str(&format!(" LIMIT ${}", param));
        param += 1;
    }
    if query.offset.is_some() {
        sql.push_str(&format!(" OFFSET ${}", param));
    }
    sql
}

fn bind_list<'q, E: PgEntity>(mut q: PgQuery<'q>, query: &ListQuery) -> PgQuery<'q> {
    if let (ParentColumn::Required(_) | ParentColumn::TemplateAware(_), Some(parent_id)) =
        (E::PARENT, query.parent_id)
    {
        q = q.bind(parent_id);
    }
    if let Some(since) = query.since {
        q = q.bind(since);
    }
    if let Some(limit) = query.limit {
        q = q.bind(limit.clamp(0, defaults::PAGE_LIMIT_MAX));
    }
    if let Some(offset) = query.offset {
        q = q.bind(offset.max(0));
    }
    q
}

// =============================================================================
// ROW MAPPING
// =============================================================================

fn bind_resource<'q>(query: PgQuery<'q>, resource: &'q Resource) -> PgQuery<'q> {
    query
        .bind(resource.id)
        .bind(resource.access.to_string())
        .bind(resource.created_by)
        .bind(resource.updated_by)
        .bind(resource.deleted_by)
        .bind(resource.created_at)
        .bind(resource.updated_at)
        .bind(resource.deleted_at)
        .bind(Json(&resource.tags))
}

/// Read the resource columns of a row.
pub fn read_resource(row: &PgRow) -> Resource {
    let access: String = row.get("access");
    Resource {
        id: row.get("id"),
        access: access.parse().unwrap_or_default(),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
        deleted_by: row.get("deleted_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
        tags: row.get::<Json<Tags>, _>("tags").0,
    }
}

pub(crate) fn entity_from_row<E: PgEntity>(row: &PgRow) -> E {
    E::from_row(row, read_resource(row))
}

/// Map constraint violations on write to domain errors.
pub(crate) fn map_write_error(err: sqlx::Error, kind: EntityKind) -> Error {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return Error::Duplicate(format!("{} already exists: {}", kind, db_err.message()));
        }
        if db_err.is_foreign_key_violation() {
            return Error::NotFound(format!(
                "{} references a missing row: {}",
                kind,
                db_err.message()
            ));
        }
    }
    Error::Database(err)
}

// =============================================================================
// REPOSITORY
// =============================================================================

/// PostgreSQL implementation of [`Repository`] for any [`PgEntity`].
pub struct PgRepository<E> {
    pool: Pool<Postgres>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for PgRepository<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<E> PgRepository<E> {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    pub(crate) fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

impl<E: PgEntity> PgRepository<E> {
    /// Live rows matching `condition` with a single text argument.
    pub(crate) async fn fetch_live_by_text(&self, condition: &str, value: &str) -> Result<Vec<E>> {
        let sql = select_live_sql::<E>(condition);
        let rows = sqlx::query(&sql)
            .bind(value)
            .fetch_all(self.pool())
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(entity_from_row::<E>).collect())
    }

    /// Live rows matching `condition` with a single id argument.
    pub(crate) async fn fetch_live_by_id(&self, condition: &str, value: Uuid) -> Result<Vec<E>> {
        let sql = select_live_sql::<E>(condition);
        let rows = sqlx::query(&sql)
            .bind(value)
            .fetch_all(self.pool())
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(entity_from_row::<E>).collect())
    }
}

#[async_trait]
impl<E: PgEntity> Repository<E> for PgRepository<E> {
    async fn insert(&self, entity: &E) -> Result<()> {
        let sql = insert_sql::<E>();
        let query = bind_resource(sqlx::query(&sql), entity.resource());
        entity
            .bind_fields(query)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, E::KIND))?;

        debug!(
            subsystem = logging::SUBSYSTEM_DB,
            component = E::TABLE,
            op = "insert",
            id = %entity.id(),
            "Row inserted"
        );
        Ok(())
    }

    async fn update(&self, entity: &E) -> Result<()> {
        let sql = update_sql::<E>();
        let query = bind_resource(sqlx::query(&sql), entity.resource());
        let result = entity
            .bind_fields(query)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, E::KIND))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "{} {} not found",
                E::KIND,
                entity.id()
            )));
        }

        debug!(
            subsystem = logging::SUBSYSTEM_DB,
            component = E::TABLE,
            op = "update",
            id = %entity.id(),
            deleted = entity.resource().is_deleted(),
            "Row updated"
        );
        Ok(())
    }

    async fn get(&self, id: Uuid, include_deleted: bool) -> Result<Option<E>> {
        let sql = get_sql::<E>(include_deleted);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(entity_from_row::<E>))
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<E>> {
        let start = Instant::now();
        let sql = list_sql::<E>(query);
        let rows = bind_list::<E>(sqlx::query(&sql), query)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = logging::SUBSYSTEM_DB,
            component = E::TABLE,
            op = "list",
            result_count = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Rows listed"
        );
        Ok(rows.iter().map(entity_from_row::<E>).collect())
    }
}
