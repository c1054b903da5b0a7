//! In-memory user directory for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{User, UserDirectory};

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with_user(self, id: i64, email: &str) -> Self {
        self.insert(User::new(UserId::new(id), email));
        self
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn insert(&self, user: User) {
        self.users
            .write()
            .expect("InMemoryUserDirectory: lock poisoned")
            .insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self
            .users
            .read()
            .expect("InMemoryUserDirectory: lock poisoned")
            .get(&id)
            .cloned())
    }
}
