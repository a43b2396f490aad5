//! Volunteer service
//!
//! Operations run on behalf of an already authenticated identity and apply
//! these ownership rules:
//! - Mutations by id first load the record; a record owned by someone else is
//!   refused, a missing record yields a zero-count result.
//! - Inserts carry the caller as owner. A body naming another owner is refused.

use crate::db::repositories::DocumentRepository;
use crate::models::{
    DeleteResult, Document, Filter, InsertResult, UpdateResult, UpdateVolunteerInput, OWNER_FIELD,
    SEARCH_FIELD,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Error types for volunteer service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The caller does not own the targeted record
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed identifier or request data
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Store failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Outcome of an ownership check
enum Ownership {
    Owned,
    Missing,
}

pub struct VolunteerService {
    posts: Arc<dyn DocumentRepository>,
    requests: Arc<dyn DocumentRepository>,
}

impl VolunteerService {
    pub fn new(posts: Arc<dyn DocumentRepository>, requests: Arc<dyn DocumentRepository>) -> Self {
        Self { posts, requests }
    }

    // ------------------------------------------------------------------
    // Volunteer posts
    // ------------------------------------------------------------------

    /// All posts, in insertion order
    pub async fn list_posts(&self) -> Result<Vec<Document>> {
        Ok(self.posts.find(&Filter::All).await?)
    }

    /// Posts whose title equals `title` exactly
    pub async fn search_posts(&self, title: &str) -> Result<Vec<Document>> {
        Ok(self.posts.find(&Filter::field_eq(SEARCH_FIELD, title)).await?)
    }

    pub async fn get_post(&self, id: &str) -> Result<Option<Document>> {
        let id = parse_id(id)?;
        Ok(self.posts.find_one(&id).await?)
    }

    pub async fn list_posts_by_owner(&self, identity: &str) -> Result<Vec<Document>> {
        Ok(self.posts.find(&Filter::field_eq(OWNER_FIELD, identity)).await?)
    }

    pub async fn create_post(&self, identity: &str, body: Document) -> Result<InsertResult> {
        let body = stamp_owner(identity, body)?;
        let result = self.posts.insert_one(body).await?;
        tracing::debug!(id = %result.inserted_id, owner = identity, "volunteer post created");
        Ok(result)
    }

    pub async fn update_post(
        &self,
        identity: &str,
        id: &str,
        input: UpdateVolunteerInput,
    ) -> Result<UpdateResult> {
        let id = parse_id(id)?;
        match ensure_owner(self.posts.as_ref(), identity, &id).await? {
            Ownership::Missing => Ok(UpdateResult::unmatched()),
            Ownership::Owned => Ok(self.posts.update_one(&id, input.into_fields()).await?),
        }
    }

    pub async fn delete_post(&self, identity: &str, id: &str) -> Result<DeleteResult> {
        let id = parse_id(id)?;
        match ensure_owner(self.posts.as_ref(), identity, &id).await? {
            Ownership::Missing => Ok(DeleteResult::new(0)),
            Ownership::Owned => {
                let result = self.posts.delete_one(&id).await?;
                tracing::debug!(id = %id, owner = identity, "volunteer post deleted");
                Ok(result)
            }
        }
    }

    // ------------------------------------------------------------------
    // Volunteer requests (applications)
    // ------------------------------------------------------------------

    pub async fn list_requests_by_owner(&self, identity: &str) -> Result<Vec<Document>> {
        Ok(self.requests.find(&Filter::field_eq(OWNER_FIELD, identity)).await?)
    }

    /// Record an application to a post
    pub async fn create_request(&self, identity: &str, body: Document) -> Result<InsertResult> {
        let body = stamp_owner(identity, body)?;
        Ok(self.requests.insert_one(body).await?)
    }

    /// Cancel an application
    pub async fn cancel_request(&self, identity: &str, id: &str) -> Result<DeleteResult> {
        let id = parse_id(id)?;
        match ensure_owner(self.requests.as_ref(), identity, &id).await? {
            Ownership::Missing => Ok(DeleteResult::new(0)),
            Ownership::Owned => Ok(self.requests.delete_one(&id).await?),
        }
    }
}

/// Normalize a record identifier
fn parse_id(id: &str) -> Result<String> {
    Uuid::parse_str(id)
        .map(|uuid| uuid.to_string())
        .map_err(|_| ServiceError::Invalid(format!("Invalid identifier: {}", id)))
}

/// Set the owner field on a new record, refusing a conflicting one
fn stamp_owner(identity: &str, mut body: Document) -> Result<Document> {
    match body.get(OWNER_FIELD) {
        None | Some(Value::Null) => {
            body.insert(OWNER_FIELD.to_string(), Value::String(identity.to_string()));
            Ok(body)
        }
        Some(Value::String(owner)) if owner == identity => Ok(body),
        Some(_) => {
            tracing::warn!(identity, "insert names a different owner");
            Err(ServiceError::Forbidden(
                "Cannot create records on behalf of another user".to_string(),
            ))
        }
    }
}

async fn ensure_owner(repo: &dyn DocumentRepository, identity: &str, id: &str) -> Result<Ownership> {
    let Some(doc) = repo.find_one(id).await? else {
        return Ok(Ownership::Missing);
    };
    if doc.get(OWNER_FIELD).and_then(Value::as_str) == Some(identity) {
        return Ok(Ownership::Owned);
    }
    tracing::warn!(
        collection = %repo.collection(),
        id,
        identity,
        "ownership mismatch on mutation"
    );
    Err(ServiceError::Forbidden("You do not own this record".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::MemoryDocumentRepository;
    use crate::models::Collection;
    use serde_json::json;

    const ALICE: &str = "alice@example.com";
    const BOB: &str = "bob@example.com";

    struct Fixture {
        service: VolunteerService,
        posts: Arc<MemoryDocumentRepository>,
        requests: Arc<MemoryDocumentRepository>,
    }

    fn fixture() -> Fixture {
        let posts = MemoryDocumentRepository::shared(Collection::VolunteerPosts);
        let requests = MemoryDocumentRepository::shared(Collection::VolunteerRequests);
        Fixture {
            service: VolunteerService::new(posts.clone(), requests.clone()),
            posts,
            requests,
        }
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_post_stamps_owner() {
        let f = fixture();
        let id = f
            .service
            .create_post(ALICE, doc(json!({"postTitle": "Beach Cleanup"})))
            .await
            .unwrap()
            .inserted_id;

        let post = f.service.get_post(&id).await.unwrap().unwrap();
        assert_eq!(post["email"], json!(ALICE));
    }

    #[tokio::test]
    async fn test_create_post_for_someone_else_is_forbidden() {
        let f = fixture();
        let err = f
            .service
            .create_post(ALICE, doc(json!({"postTitle": "x", "email": BOB})))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert_eq!(f.posts.operation_count(), 0);
    }

    #[tokio::test]
    async fn test_search_is_exact() {
        let f = fixture();
        f.service
            .create_post(ALICE, doc(json!({"postTitle": "Beach Cleanup"})))
            .await
            .unwrap();

        assert_eq!(f.service.search_posts("Beach Cleanup").await.unwrap().len(), 1);
        assert!(f.service.search_posts("beach cleanup").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_posts_by_owner() {
        let f = fixture();
        f.service.create_post(ALICE, doc(json!({"postTitle": "a"}))).await.unwrap();
        f.service.create_post(BOB, doc(json!({"postTitle": "b"}))).await.unwrap();

        let mine = f.service.list_posts_by_owner(ALICE).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["postTitle"], json!("a"));
        assert_eq!(f.service.list_posts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_post_by_owner() {
        let f = fixture();
        let id = f
            .service
            .create_post(ALICE, doc(json!({"postTitle": "a"})))
            .await
            .unwrap()
            .inserted_id;

        let input: UpdateVolunteerInput =
            serde_json::from_value(json!({"postTitle": "b", "email": BOB})).unwrap();
        let result = f.service.update_post(ALICE, &id, input).await.unwrap();
        assert_eq!(result, UpdateResult::new(1, 1));

        let post = f.service.get_post(&id).await.unwrap().unwrap();
        assert_eq!(post["postTitle"], json!("b"));
        assert_eq!(post["email"], json!(ALICE));
    }

    #[tokio::test]
    async fn test_update_post_by_other_user_is_forbidden() {
        let f = fixture();
        let id = f
            .service
            .create_post(ALICE, doc(json!({"postTitle": "a"})))
            .await
            .unwrap()
            .inserted_id;

        let err = f
            .service
            .update_post(BOB, &id, UpdateVolunteerInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_post_reports_zero() {
        let f = fixture();
        let result = f
            .service
            .delete_post(ALICE, &Uuid::new_v4().to_string())
            .await
            .unwrap();
        assert_eq!(result, DeleteResult::new(0));
    }

    #[tokio::test]
    async fn test_delete_post_by_other_user_is_forbidden() {
        let f = fixture();
        let id = f
            .service
            .create_post(ALICE, doc(json!({"postTitle": "a"})))
            .await
            .unwrap()
            .inserted_id;

        assert!(matches!(
            f.service.delete_post(BOB, &id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(f.service.delete_post(ALICE, &id).await.unwrap(), DeleteResult::new(1));
    }

    #[tokio::test]
    async fn test_malformed_id_is_invalid() {
        let f = fixture();
        assert!(matches!(
            f.service.get_post("not-an-id").await,
            Err(ServiceError::Invalid(_))
        ));
        assert!(matches!(
            f.service.delete_post(ALICE, "not-an-id").await,
            Err(ServiceError::Invalid(_))
        ));
        assert_eq!(f.posts.operation_count(), 0);
    }

    #[tokio::test]
    async fn test_requests_lifecycle() {
        let f = fixture();
        let id = f
            .service
            .create_request(ALICE, doc(json!({"postId": "p1", "email": ALICE})))
            .await
            .unwrap()
            .inserted_id;
        f.service
            .create_request(BOB, doc(json!({"postId": "p1"})))
            .await
            .unwrap();

        let mine = f.service.list_requests_by_owner(ALICE).await.unwrap();
        assert_eq!(mine.len(), 1);

        assert!(matches!(
            f.service.cancel_request(BOB, &id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(f.service.cancel_request(ALICE, &id).await.unwrap(), DeleteResult::new(1));
        assert!(f.service.list_requests_by_owner(ALICE).await.unwrap().is_empty());
        assert!(f.requests.operation_count() > 0);
    }

    #[test]
    fn test_parse_id_normalizes_case() {
        let id = Uuid::new_v4();
        let upper = id.to_string().to_uppercase();
        assert_eq!(parse_id(&upper).unwrap(), id.to_string());
    }
}
