//! The username and password strategy.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{
    hasher::{HashError, PasswordHasher},
    store::{self, CredentialStore},
    AuthFailure, AuthUser, AuthnBackend, UserId,
};

/// A registered user.
///
/// Serializes to the stored document shape, `{ _id, username, password }`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub(crate) id: ObjectId,

    /// Lookup key for authentication.
    pub username: String,

    #[serde(rename = "password")]
    pub(crate) password_hash: String,
}

impl User {
    /// Assembles a user from its stored parts.
    pub fn new(id: ObjectId, username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }

    /// The stored bcrypt hash.
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

// Here we've implemented `Debug` manually to avoid accidentally logging the
// password hash.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl AuthUser for User {
    type Id = ObjectId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A username and password pair, as submitted by the login and sign up forms.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// The username to look up.
    pub username: String,

    /// The plaintext password, as entered.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Errors raised by [`Backend`].
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// A mapping to `store::Error`.
    #[error(transparent)]
    Store(#[from] store::Error),

    /// A mapping to `HashError`.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Authenticates users by username and password against a credential store.
#[derive(Debug, Clone)]
pub struct Backend {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
}

impl Backend {
    /// Creates a backend reading and writing users through `store`.
    pub fn new(store: impl CredentialStore + 'static, hasher: PasswordHasher) -> Self {
        Self {
            store: Arc::new(store),
            hasher,
        }
    }

    /// Registers a new user.
    ///
    /// The password is hashed before it reaches the store. A username that is
    /// already registered yields [`AuthFailure::UsernameTaken`].
    #[tracing::instrument(level = "debug", skip_all, fields(username = %creds.username), err)]
    pub async fn signup(&self, creds: Credentials) -> Result<Result<User, AuthFailure>, BackendError> {
        let password_hash = self.hasher.hash(creds.password).await?;

        match self.store.insert(&creds.username, &password_hash).await {
            Ok(user) => Ok(Ok(user)),
            Err(store::Error::DuplicateUsername) => Ok(Err(AuthFailure::UsernameTaken)),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = User;
    type Credentials = Credentials;
    type Error = BackendError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Result<Self::User, AuthFailure>, Self::Error> {
        let Some(user) = self.store.find_by_username(&creds.username).await? else {
            return Ok(Err(AuthFailure::UnknownUser));
        };

        let verified = self
            .hasher
            .verify(creds.password, user.password_hash.clone())
            .await?;

        if verified {
            Ok(Ok(user))
        } else {
            Ok(Err(AuthFailure::BadPassword))
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok(self.store.find_by_id(user_id).await?)
    }
}

/// The auth session for [`Backend`].
pub type AuthSession = crate::AuthSession<Backend>;
