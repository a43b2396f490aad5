//! Database migrations
//!
//! Creates the two document collections. Migrations are embedded in the binary
//! and recorded in a `_migrations` table so each runs exactly once.
//!
//! ```ignore
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::pool::{mysql_pool, sqlite_pool};
use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Document bodies are stored as JSON text; `id` is a UUID string and `seq`
/// preserves insertion order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_volunteer_posts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS volunteer_posts (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id VARCHAR(36) NOT NULL UNIQUE,
                body TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS volunteer_posts (
                seq BIGINT PRIMARY KEY AUTO_INCREMENT,
                id VARCHAR(36) NOT NULL UNIQUE,
                body LONGTEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_volunteer_requests",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS volunteer_requests (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id VARCHAR(36) NOT NULL UNIQUE,
                body TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS volunteer_requests (
                seq BIGINT PRIMARY KEY AUTO_INCREMENT,
                id VARCHAR(36) NOT NULL UNIQUE,
                body LONGTEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
];

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY,
        name VARCHAR(255) NOT NULL UNIQUE,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

/// Apply all pending migrations, returning how many ran
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    let applied = applied_versions(pool).await?;

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        tracing::info!("Applying migration {}: {}", migration.version, migration.name);
        let result = match pool.driver() {
            DatabaseDriver::Sqlite => apply_sqlite(sqlite_pool(pool)?, migration).await,
            DatabaseDriver::Mysql => apply_mysql(mysql_pool(pool)?, migration).await,
        };
        result.with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    let applied = applied_versions(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .count())
}

/// Create the tracking table if needed and list applied versions
async fn applied_versions(pool: &DynDatabasePool) -> Result<Vec<i32>> {
    let rows = match pool.driver() {
        DatabaseDriver::Sqlite => {
            let pool = sqlite_pool(pool)?;
            sqlx::query(CREATE_MIGRATIONS_TABLE).execute(pool).await?;
            sqlx::query("SELECT version FROM _migrations ORDER BY version")
                .fetch_all(pool)
                .await?
                .iter()
                .map(|r| r.get::<i64, _>("version") as i32)
                .collect()
        }
        DatabaseDriver::Mysql => {
            let pool = mysql_pool(pool)?;
            sqlx::query(CREATE_MIGRATIONS_TABLE).execute(pool).await?;
            sqlx::query("SELECT version FROM _migrations ORDER BY version")
                .fetch_all(pool)
                .await?
                .iter()
                .map(|r| r.get::<i32, _>("version"))
                .collect()
        }
    };
    Ok(rows)
}

async fn apply_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

// MySQL DDL commits implicitly, so there is no transaction here.
async fn apply_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual non-empty statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_comment_only(s))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}
