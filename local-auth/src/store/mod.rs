//! Persistence of [`User`] records.
//!
//! The store is the only component that owns users. The authentication backend
//! reads from it on every login and on every request that carries a session,
//! and writes to it on signup.

use std::fmt::Debug;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

pub use self::{memory::MemoryStore, mongo::MongoStore};
use crate::users::User;

mod memory;
mod mongo;

/// An error raised by a [`CredentialStore`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mapping to `mongodb::error::Error`.
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    /// A user with the same username already exists.
    #[error("username is already registered")]
    DuplicateUsername,
}

pub(crate) type Result<T = ()> = std::result::Result<T, Error>;

/// A trait which defines the reads and writes the authentication workflow
/// needs from a user store.
#[async_trait]
pub trait CredentialStore: Debug + Send + Sync {
    /// Loads the user registered under `username`.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Loads the user with the given ID.
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>>;

    /// Persists a new user and returns it with its assigned ID.
    ///
    /// Fails with [`Error::DuplicateUsername`] when the username is taken.
    async fn insert(&self, username: &str, password_hash: &str) -> Result<User>;
}
