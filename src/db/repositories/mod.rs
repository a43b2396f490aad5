//! Database repositories
//!
//! One `DocumentRepository` per collection. `SqlxDocumentRepository` is the
//! production store; `MemoryDocumentRepository` is a drop-in test double.

pub mod document;
pub mod memory;

pub use document::{DocumentRepository, SqlxDocumentRepository};
pub use memory::MemoryDocumentRepository;
