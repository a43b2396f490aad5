//! Services layer - Business logic
//!
//! - `token`: session token issue/validate
//! - `volunteer`: ownership rules around the document store

pub mod token;
pub mod volunteer;

pub use token::{TokenCodec, TokenError};
pub use volunteer::{ServiceError, VolunteerService};
