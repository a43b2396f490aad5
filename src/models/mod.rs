//! Data models
//!
//! This module contains the data structures shared across the backend:
//! - Stored documents and the store's native operation results
//! - Volunteer post update input
//! - Session token claims

mod document;
mod session;
mod volunteer;

pub use document::{Collection, DeleteResult, Document, Filter, InsertResult, UpdateResult, ID_FIELD};
pub use session::SessionClaims;
pub use volunteer::{UpdateVolunteerInput, OWNER_FIELD, SEARCH_FIELD};
