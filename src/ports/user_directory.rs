//! User directory port.
//!
//! Accounts are owned by the wider application; billing only needs to know
//! whether a user exists and where to email them.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

/// The slice of an account billing cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up an account. Returns `None` if it does not exist.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;
}
