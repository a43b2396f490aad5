//! Database layer
//!
//! The document store behind the HTTP handlers. It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (selected with `database.driver: mysql`)
//!
//! # Usage
//!
//! ```ignore
//! use volunteer_avenue::config::DatabaseConfig;
//! use volunteer_avenue::db::{create_pool, migrations};
//! use volunteer_avenue::db::repositories::SqlxDocumentRepository;
//! use volunteer_avenue::models::Collection;
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! let posts = SqlxDocumentRepository::boxed(pool.clone(), Collection::VolunteerPosts);
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
