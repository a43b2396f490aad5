//! Stored documents and native store results
//!
//! Records are schema-flexible JSON objects. The store assigns each one an
//! identifier, exposed to clients under `_id`. Write operations answer with
//! result objects shaped like a document database driver's (`insertedId`,
//! `deletedCount`, `matchedCount`...), and those are sent to clients as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schema-flexible record
pub type Document = Map<String, Value>;

/// Field under which a document's identifier is exposed
pub const ID_FIELD: &str = "_id";

/// The two logical collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Volunteer posts ("need volunteer")
    VolunteerPosts,
    /// Applications to a post ("be a volunteer")
    VolunteerRequests,
}

impl Collection {
    /// Backing table name
    pub fn table(self) -> &'static str {
        match self {
            Self::VolunteerPosts => "volunteer_posts",
            Self::VolunteerRequests => "volunteer_requests",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Selector for find-many queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every document in the collection
    All,
    /// Documents whose top-level string `field` equals `value` exactly
    FieldEq { field: &'static str, value: String },
}

impl Filter {
    pub fn field_eq(field: &'static str, value: impl Into<String>) -> Self {
        Self::FieldEq {
            field,
            value: value.into(),
        }
    }

    /// Evaluate the filter against a document
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::FieldEq { field, value } => {
                doc.get(*field).and_then(Value::as_str) == Some(value.as_str())
            }
        }
    }
}

/// Result of an insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: String,
}

impl InsertResult {
    pub fn new(inserted_id: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            inserted_id: inserted_id.into(),
        }
    }
}

/// Result of a delete-one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

/// Result of an update-one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<String>,
    pub upserted_count: u64,
}

impl UpdateResult {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_id: None,
            upserted_count: 0,
        }
    }

    /// Nothing matched the selector
    pub fn unmatched() -> Self {
        Self::new(0, 0)
    }
}
