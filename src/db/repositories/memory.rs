//! In-memory document repository
//!
//! A `DocumentRepository` that keeps documents in a process-local vector.
//! Handlers and services accept any repository, so tests can hand them this
//! one and inspect `operation_count` to prove a request never reached the
//! store.

use crate::models::{
    Collection, DeleteResult, Document, Filter, InsertResult, UpdateResult, ID_FIELD,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct MemoryDocumentRepository {
    collection: Collection,
    /// (id, body) pairs in insertion order
    docs: RwLock<Vec<(String, Document)>>,
    operations: AtomicU64,
}

impl MemoryDocumentRepository {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            docs: RwLock::new(Vec::new()),
            operations: AtomicU64::new(0),
        }
    }

    pub fn shared(collection: Collection) -> Arc<Self> {
        Arc::new(Self::new(collection))
    }

    /// Number of store operations served so far
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    fn record(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }
}

fn with_id(id: &str, body: &Document) -> Document {
    let mut doc = body.clone();
    doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    doc
}

#[async_trait]
impl super::DocumentRepository for MemoryDocumentRepository {
    fn collection(&self) -> Collection {
        self.collection
    }

    async fn insert_one(&self, mut doc: Document) -> Result<InsertResult> {
        self.record();
        doc.remove(ID_FIELD);
        let id = Uuid::new_v4().to_string();
        self.docs.write().await.push((id.clone(), doc));
        Ok(InsertResult::new(id))
    }

    async fn find_one(&self, id: &str) -> Result<Option<Document>> {
        self.record();
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(doc_id, body)| with_id(doc_id, body)))
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>> {
        self.record();
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|(_, body)| filter.matches(body))
            .map(|(doc_id, body)| with_id(doc_id, body))
            .collect())
    }

    async fn update_one(&self, id: &str, fields: Document) -> Result<UpdateResult> {
        self.record();
        let mut docs = self.docs.write().await;
        let Some((_, body)) = docs.iter_mut().find(|(doc_id, _)| doc_id == id) else {
            return Ok(UpdateResult::unmatched());
        };

        let mut modified = false;
        for (key, value) in fields {
            if key != ID_FIELD && body.get(&key) != Some(&value) {
                body.insert(key, value);
                modified = true;
            }
        }
        Ok(UpdateResult::new(1, u64::from(modified)))
    }

    async fn delete_one(&self, id: &str) -> Result<DeleteResult> {
        self.record();
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|(doc_id, _)| doc_id != id);
        Ok(DeleteResult::new((before - docs.len()) as u64))
    }
}
