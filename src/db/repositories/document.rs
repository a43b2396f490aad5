//! Document repository
//!
//! Persists schema-flexible JSON records in one table per collection. Queries
//! are by identifier or by exact equality on a single top-level string field.
//!
//! This module provides:
//! - `DocumentRepository` trait, the store contract handlers depend on
//! - `SqlxDocumentRepository` implementing it for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql_pool, sqlite_pool};
use crate::db::DynDatabasePool;
use crate::models::{
    Collection, DeleteResult, Document, Filter, InsertResult, UpdateResult, ID_FIELD,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Store operations over one collection
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// The collection this repository serves
    fn collection(&self) -> Collection;

    /// Insert a document under a freshly generated identifier.
    ///
    /// Any client-supplied `_id` is discarded.
    async fn insert_one(&self, doc: Document) -> Result<InsertResult>;

    /// Fetch one document by identifier
    async fn find_one(&self, id: &str) -> Result<Option<Document>>;

    /// Fetch every document matching `filter`, in insertion order
    async fn find(&self, filter: &Filter) -> Result<Vec<Document>>;

    /// Set `fields` on the document with identifier `id`
    async fn update_one(&self, id: &str, fields: Document) -> Result<UpdateResult>;

    /// Delete the document with identifier `id`
    async fn delete_one(&self, id: &str) -> Result<DeleteResult>;
}

/// SQLx-based document repository
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxDocumentRepository {
    pool: DynDatabasePool,
    collection: Collection,
}

impl SqlxDocumentRepository {
    pub fn new(pool: DynDatabasePool, collection: Collection) -> Self {
        Self { pool, collection }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool, collection: Collection) -> Arc<dyn DocumentRepository> {
        Arc::new(Self::new(pool, collection))
    }

    fn table(&self) -> &'static str {
        self.collection.table()
    }
}

#[async_trait]
impl DocumentRepository for SqlxDocumentRepository {
    fn collection(&self) -> Collection {
        self.collection
    }

    async fn insert_one(&self, mut doc: Document) -> Result<InsertResult> {
        doc.remove(ID_FIELD);
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(&doc)?;
        let sql = format!("INSERT INTO {} (id, body) VALUES (?, ?)", self.table());

        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(&id)
                .bind(&body)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(&id)
                .bind(&body)
                .execute(mysql_pool(&self.pool)?)
                .await
                .map(|_| ()),
        };
        result.with_context(|| format!("Failed to insert into {}", self.collection))?;

        Ok(InsertResult::new(id))
    }

    async fn find_one(&self, id: &str) -> Result<Option<Document>> {
        let sql = format!("SELECT id, body FROM {} WHERE id = ?", self.table());
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(sqlite_pool(&self.pool)?)
                .await
                .with_context(|| format!("Failed to get document from {}", self.collection))?
                .map(|r| (r.get::<String, _>("id"), r.get::<String, _>("body"))),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(mysql_pool(&self.pool)?)
                .await
                .with_context(|| format!("Failed to get document from {}", self.collection))?
                .map(|r| (r.get::<String, _>("id"), r.get::<String, _>("body"))),
        };
        row.map(|(id, body)| to_document(id, &body)).transpose()
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>> {
        let rows = match self.pool.driver() {
            DatabaseDriver::Sqlite => find_sqlite(sqlite_pool(&self.pool)?, self.table(), filter).await,
            DatabaseDriver::Mysql => find_mysql(mysql_pool(&self.pool)?, self.table(), filter).await,
        }
        .with_context(|| format!("Failed to query {}", self.collection))?;

        rows.into_iter()
            .map(|(id, body)| to_document(id, &body))
            .collect()
    }

    async fn update_one(&self, id: &str, fields: Document) -> Result<UpdateResult> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(sqlite_pool(&self.pool)?, self.table(), id, fields).await,
            DatabaseDriver::Mysql => update_mysql(mysql_pool(&self.pool)?, self.table(), id, fields).await,
        };
        result.with_context(|| format!("Failed to update document in {}", self.collection))
    }

    async fn delete_one(&self, id: &str) -> Result<DeleteResult> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.table());
        let deleted = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .execute(mysql_pool(&self.pool)?)
                .await
                .map(|r| r.rows_affected()),
        }
        .with_context(|| format!("Failed to delete document from {}", self.collection))?;

        Ok(DeleteResult::new(deleted))
    }
}

/// Parse a stored body and expose its identifier under `_id`
fn to_document(id: String, body: &str) -> Result<Document> {
    let mut doc = match serde_json::from_str::<Value>(body).context("Corrupt document body")? {
        Value::Object(map) => map,
        other => anyhow::bail!("Stored document {} is not an object: {}", id, other),
    };
    doc.insert(ID_FIELD.to_string(), Value::String(id));
    Ok(doc)
}

/// Apply `fields` over `doc`, reporting whether anything changed
fn merge_fields(doc: &mut Document, fields: Document) -> bool {
    let mut modified = false;
    for (key, value) in fields {
        if key == ID_FIELD {
            continue;
        }
        if doc.get(&key) != Some(&value) {
            doc.insert(key, value);
            modified = true;
        }
    }
    modified
}

// SQLite implementations
async fn find_sqlite(pool: &SqlitePool, table: &str, filter: &Filter) -> sqlx::Result<Vec<(String, String)>> {
    let rows = match filter {
        Filter::All => {
            sqlx::query(&format!("SELECT id, body FROM {} ORDER BY seq", table))
                .fetch_all(pool)
                .await?
        }
        Filter::FieldEq { field, value } => {
            // json_extract renders arrays and objects as JSON text, so the type is checked too.
            let path = format!("$.{}", field);
            sqlx::query(&format!(
                "SELECT id, body FROM {} WHERE json_type(body, ?) = 'text' AND json_extract(body, ?) = ? ORDER BY seq",
                table
            ))
            .bind(&path)
            .bind(&path)
            .bind(value)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows.iter().map(|r| (r.get("id"), r.get("body"))).collect())
}

async fn update_sqlite(pool: &SqlitePool, table: &str, id: &str, fields: Document) -> Result<UpdateResult> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!("SELECT id, body FROM {} WHERE id = ?", table))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(row) = row else {
        return Ok(UpdateResult::unmatched());
    };

    let mut doc = to_document(row.get("id"), row.get::<String, _>("body").as_str())?;
    doc.remove(ID_FIELD);
    if !merge_fields(&mut doc, fields) {
        return Ok(UpdateResult::new(1, 0));
    }

    sqlx::query(&format!("UPDATE {} SET body = ? WHERE id = ?", table))
        .bind(serde_json::to_string(&doc)?)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(UpdateResult::new(1, 1))
}

// MySQL implementations
async fn find_mysql(pool: &MySqlPool, table: &str, filter: &Filter) -> sqlx::Result<Vec<(String, String)>> {
    let rows = match filter {
        Filter::All => {
            sqlx::query(&format!("SELECT id, body FROM {} ORDER BY seq", table))
                .fetch_all(pool)
                .await?
        }
        Filter::FieldEq { field, value } => {
            // JSON string comparison is binary, hence exact and case-sensitive.
            let path = format!("$.{}", field);
            sqlx::query(&format!(
                "SELECT id, body FROM {} WHERE JSON_TYPE(JSON_EXTRACT(body, ?)) = 'STRING' AND JSON_EXTRACT(body, ?) = CAST(? AS JSON) ORDER BY seq",
                table
            ))
            .bind(&path)
            .bind(&path)
            .bind(Value::String(value.clone()).to_string())
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows.iter().map(|r| (r.get("id"), r.get("body"))).collect())
}

async fn update_mysql(pool: &MySqlPool, table: &str, id: &str, fields: Document) -> Result<UpdateResult> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!("SELECT id, body FROM {} WHERE id = ? FOR UPDATE", table))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(row) = row else {
        return Ok(UpdateResult::unmatched());
    };

    let mut doc = to_document(row.get("id"), row.get::<String, _>("body").as_str())?;
    doc.remove(ID_FIELD);
    if !merge_fields(&mut doc, fields) {
        return Ok(UpdateResult::new(1, 0));
    }

    sqlx::query(&format!("UPDATE {} SET body = ? WHERE id = ?", table))
        .bind(serde_json::to_string(&doc)?)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(UpdateResult::new(1, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use serde_json::json;

    async fn setup_repo(collection: Collection) -> SqlxDocumentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxDocumentRepository::new(pool, collection)
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn beach_cleanup() -> Document {
        doc(json!({
            "postTitle": "Beach Cleanup",
            "category": "environment",
            "volunteerNumber": 10,
            "email": "alice@example.com"
        }))
    }

    #[tokio::test]
    async fn test_insert_and_find_one() {
        let repo = setup_repo(Collection::VolunteerPosts).await;

        let inserted = repo.insert_one(beach_cleanup()).await.unwrap();
        assert!(inserted.acknowledged);
        assert!(Uuid::parse_str(&inserted.inserted_id).is_ok());

        let found = repo.find_one(&inserted.inserted_id).await.unwrap().unwrap();
        assert_eq!(found["_id"], json!(inserted.inserted_id));
        assert_eq!(found["postTitle"], json!("Beach Cleanup"));
        assert_eq!(found["volunteerNumber"], json!(10));
    }

    #[tokio::test]
    async fn test_insert_discards_client_id() {
        let repo = setup_repo(Collection::VolunteerPosts).await;

        let mut post = beach_cleanup();
        post.insert("_id".to_string(), json!("forged"));
        let inserted = repo.insert_one(post).await.unwrap();

        assert_ne!(inserted.inserted_id, "forged");
        assert!(repo.find_one("forged").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_one_missing() {
        let repo = setup_repo(Collection::VolunteerPosts).await;
        assert!(repo.find_one(&Uuid::new_v4().to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_all_in_insertion_order() {
        let repo = setup_repo(Collection::VolunteerPosts).await;
        for title in ["first", "second", "third"] {
            repo.insert_one(doc(json!({"postTitle": title}))).await.unwrap();
        }

        let all = repo.find(&Filter::All).await.unwrap();
        let titles: Vec<_> = all.iter().map(|d| d["postTitle"].clone()).collect();
        assert_eq!(titles, vec![json!("first"), json!("second"), json!("third")]);
    }

    #[tokio::test]
    async fn test_find_by_field_is_exact() {
        let repo = setup_repo(Collection::VolunteerPosts).await;
        repo.insert_one(beach_cleanup()).await.unwrap();
        repo.insert_one(doc(json!({"postTitle": "Tree Planting"}))).await.unwrap();

        let exact = repo.find(&Filter::field_eq("postTitle", "Beach Cleanup")).await.unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0]["postTitle"], json!("Beach Cleanup"));

        let lower = repo.find(&Filter::field_eq("postTitle", "beach cleanup")).await.unwrap();
        assert!(lower.is_empty());

        let partial = repo.find(&Filter::field_eq("postTitle", "Beach")).await.unwrap();
        assert!(partial.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_field_ignores_numbers() {
        let repo = setup_repo(Collection::VolunteerPosts).await;
        repo.insert_one(beach_cleanup()).await.unwrap();

        let found = repo.find(&Filter::field_eq("volunteerNumber", "10")).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_field_ignores_arrays_and_objects() {
        let repo = setup_repo(Collection::VolunteerPosts).await;
        repo.insert_one(doc(json!({"postTitle": ["x"]}))).await.unwrap();
        repo.insert_one(doc(json!({"postTitle": {"a": 1}}))).await.unwrap();
        repo.insert_one(doc(json!({"postTitle": "[\"x\"]"}))).await.unwrap();

        let found = repo.find(&Filter::field_eq("postTitle", r#"["x"]"#)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["postTitle"], json!(r#"["x"]"#));

        let found = repo.find(&Filter::field_eq("postTitle", r#"{"a":1}"#)).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let posts = SqlxDocumentRepository::new(pool.clone(), Collection::VolunteerPosts);
        let requests = SqlxDocumentRepository::new(pool, Collection::VolunteerRequests);

        posts.insert_one(beach_cleanup()).await.unwrap();

        assert_eq!(posts.find(&Filter::All).await.unwrap().len(), 1);
        assert!(requests.find(&Filter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_sets_fields() {
        let repo = setup_repo(Collection::VolunteerPosts).await;
        let id = repo.insert_one(beach_cleanup()).await.unwrap().inserted_id;

        let result = repo
            .update_one(&id, doc(json!({"postTitle": "Lake Cleanup", "location": "Sylhet"})))
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::new(1, 1));

        let updated = repo.find_one(&id).await.unwrap().unwrap();
        assert_eq!(updated["postTitle"], json!("Lake Cleanup"));
        assert_eq!(updated["location"], json!("Sylhet"));
        assert_eq!(updated["email"], json!("alice@example.com"));
    }

    #[tokio::test]
    async fn test_update_without_changes_reports_unmodified() {
        let repo = setup_repo(Collection::VolunteerPosts).await;
        let id = repo.insert_one(beach_cleanup()).await.unwrap().inserted_id;

        let result = repo
            .update_one(&id, doc(json!({"postTitle": "Beach Cleanup"})))
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::new(1, 0));
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let repo = setup_repo(Collection::VolunteerPosts).await;
        let result = repo
            .update_one(&Uuid::new_v4().to_string(), doc(json!({"postTitle": "x"})))
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::unmatched());
    }

    #[tokio::test]
    async fn test_delete_one() {
        let repo = setup_repo(Collection::VolunteerRequests).await;
        let id = repo
            .insert_one(doc(json!({"email": "alice@example.com"})))
            .await
            .unwrap()
            .inserted_id;

        assert_eq!(repo.delete_one(&id).await.unwrap(), DeleteResult::new(1));
        assert!(repo.find_one(&id).await.unwrap().is_none());
        assert_eq!(repo.delete_one(&id).await.unwrap(), DeleteResult::new(0));
    }

    #[test]
    fn test_merge_fields_reports_modification() {
        let mut stored = beach_cleanup();
        assert!(!merge_fields(&mut stored, doc(json!({"category": "environment"}))));
        assert!(merge_fields(&mut stored, doc(json!({"category": "health"}))));
        assert_eq!(stored["category"], json!("health"));
        assert!(!merge_fields(&mut stored, doc(json!({"_id": "ignored"}))));
        assert!(!stored.contains_key("_id"));
    }

    #[test]
    fn test_to_document_rejects_non_objects() {
        assert!(to_document("x".to_string(), "[1,2]").is_err());
        assert!(to_document("x".to_string(), "not json").is_err());
    }
}
