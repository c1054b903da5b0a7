//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the request context and error types
//! that form the vocabulary of the billing domain.

mod context;
mod errors;
mod ids;
mod timestamp;

pub use context::{Provider, RequestContext};
pub use errors::{DomainError, ErrorCode};
pub use ids::UserId;
pub use timestamp::Timestamp;
