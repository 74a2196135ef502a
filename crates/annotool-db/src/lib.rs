//! # annotool-db
//!
//! PostgreSQL database layer for annotool.
//!
//! This crate provides:
//! - Connection pool management
//! - One generic repository per entity table, sharing the resource columns
//! - Series lookups across videos for categories
//! - The [`Database`] aggregate, which implements [`Store`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use annotool_db::{Database, Repository, Video};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/annotool").await?;
//!     let video = db.videos.get(video_id, false).await?;
//!     println!("{:?}", video);
//!     Ok(())
//! }
//! ```
pub mod categories;
pub mod pool;
pub mod repository;
pub mod scales;
pub mod tracks;
pub mod users;
pub mod videos;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use annotool_core::*;

pub use categories::{PgCategoryRepository, PgLabelRepository};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use repository::{ParentColumn, PgEntity, PgRepository};
pub use scales::{PgScaleRepository, PgScaleValueRepository};
pub use tracks::{PgAnnotationRepository, PgCommentRepository, PgTrackRepository};
pub use users::PgUserRepository;
pub use videos::PgVideoRepository;

use sqlx::{Pool, Postgres};

/// Database connection and repository access.
#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
    pub users: PgUserRepository,
    pub videos: PgVideoRepository,
    pub tracks: PgTrackRepository,
    pub annotations: PgAnnotationRepository,
    pub comments: PgCommentRepository,
    pub scales: PgScaleRepository,
    pub scale_values: PgScaleValueRepository,
    pub categories: PgCategoryRepository,
    pub labels: PgLabelRepository,
}

impl Database {
    /// Create a new database instance from a connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: PgRepository::new(pool.clone()),
            videos: PgRepository::new(pool.clone()),
            tracks: PgRepository::new(pool.clone()),
            annotations: PgRepository::new(pool.clone()),
            comments: PgRepository::new(pool.clone()),
            scales: PgRepository::new(pool.clone()),
            scale_values: PgRepository::new(pool.clone()),
            categories: PgRepository::new(pool.clone()),
            labels: PgRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the database using the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Connect to the database with custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}

impl Store for Database {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn videos(&self) -> &dyn VideoRepository {
        &self.videos
    }

    fn tracks(&self) -> &dyn Repository<Track> {
        &self.tracks
    }

    fn annotations(&self) -> &dyn Repository<Annotation> {
        &self.annotations
    }

    fn comments(&self) -> &dyn Repository<Comment> {
        &self.comments
    }

    fn scales(&self) -> &dyn Repository<Scale> {
        &self.scales
    }

    fn scale_values(&self) -> &dyn Repository<ScaleValue> {
        &self.scale_values
    }

    fn categories(&self) -> &dyn CategoryRepository {
        &self.categories
    }

    fn labels(&self) -> &dyn Repository<Label> {
        &self.labels
    }
}
