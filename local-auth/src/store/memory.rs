//! An in-memory implementation of `CredentialStore`.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{CredentialStore, Error, Result};
use crate::users::User;

/// An ephemeral store, useful for testing and demonstration purposes.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<ObjectId, User>>>,
}

impl MemoryStore {
    /// Creates a new, empty memory store.
    ///
    /// ```rust
    /// use local_auth::store::MemoryStore;
    ///
    /// let memory_store = MemoryStore::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the user with the given ID, returning it if it was present.
    pub async fn remove(&self, id: &ObjectId) -> Option<User> {
        self.inner.write().await.remove(id)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.inner.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn insert(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut users = self.inner.write().await;

        if users.values().any(|u| u.username == username) {
            return Err(Error::DuplicateUsername);
        }

        let user = User::new(ObjectId::new(), username, password_hash);
        users.insert(user.id, user.clone());

        Ok(user)
    }
}
