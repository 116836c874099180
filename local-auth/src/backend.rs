use std::fmt::{Debug, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Type alias for the backend user's ID.
pub type UserId<Backend> = <<Backend as AuthnBackend>::User as AuthUser>::Id;

/// A user which can be identified and carried across requests by its ID.
///
/// # Examples
///
/// ```rust
/// use local_auth::AuthUser;
///
/// #[derive(Debug, Clone)]
/// struct User {
///     id: i64,
/// }
///
/// impl AuthUser for User {
///     type Id = i64;
///
///     fn id(&self) -> Self::Id {
///         self.id
///     }
/// }
/// ```
pub trait AuthUser: Debug + Clone + Send + Sync {
    /// An identifying feature of the user.
    ///
    /// This is the only part of a user that is written into the session.
    type Id: Debug + Display + Clone + Send + Sync + Serialize + for<'de> Deserialize<'de>;

    /// Returns some identifying feature of the user.
    fn id(&self) -> Self::Id;
}

/// The reason an authentication attempt did not produce a user.
///
/// These are recoverable by the user, e.g. by re-entering credentials. Errors
/// in the underlying store are reported separately via
/// [`AuthnBackend::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// No user is registered under the given username.
    #[error("incorrect username")]
    UnknownUser,

    /// The user exists but the password does not match.
    #[error("incorrect password")]
    BadPassword,

    /// The session token no longer refers to a user.
    #[error("session is no longer valid")]
    SessionInvalid,

    /// Signup was attempted with a username that is already registered.
    #[error("username is already taken")]
    UsernameTaken,
}

/// A backend which can authenticate users.
///
/// Backends must implement:
///
/// 1. [`authenticate`](AuthnBackend::authenticate), a method for authenticating
///    users with credentials and,
/// 2. [`get_user`](AuthnBackend::get_user) a method for getting a user by an
///    identifying feature.
///
/// With these two methods, users may be authenticated and later retrieved via
/// the backend. Each backend is one authentication strategy; callers only see
/// the associated types, so a password backend and a token backend can be
/// swapped without touching the routes that use them.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
///
/// use async_trait::async_trait;
/// use local_auth::{AuthFailure, AuthUser, AuthnBackend, UserId};
///
/// #[derive(Debug, Clone)]
/// struct User {
///     id: i64,
///     token: String,
/// }
///
/// impl AuthUser for User {
///     type Id = i64;
///
///     fn id(&self) -> Self::Id {
///         self.id
///     }
/// }
///
/// #[derive(Clone, Default)]
/// struct Backend {
///     users: HashMap<i64, User>,
/// }
///
/// #[derive(Clone)]
/// struct Credentials {
///     user_id: i64,
///     token: String,
/// }
///
/// #[async_trait]
/// impl AuthnBackend for Backend {
///     type User = User;
///     type Credentials = Credentials;
///     type Error = std::convert::Infallible;
///
///     async fn authenticate(
///         &self,
///         Credentials { user_id, token }: Self::Credentials,
///     ) -> Result<Result<Self::User, AuthFailure>, Self::Error> {
///         let Some(user) = self.users.get(&user_id) else {
///             return Ok(Err(AuthFailure::UnknownUser));
///         };
///         if user.token != token {
///             return Ok(Err(AuthFailure::BadPassword));
///         }
///         Ok(Ok(user.clone()))
///     }
///
///     async fn get_user(
///         &self,
///         user_id: &UserId<Self>,
///     ) -> Result<Option<Self::User>, Self::Error> {
///         Ok(self.users.get(user_id).cloned())
///     }
/// }
/// ```
#[async_trait]
pub trait AuthnBackend: Clone + Send + Sync {
    /// Authenticating user type.
    type User: AuthUser;

    /// Credential type used for authentication.
    type Credentials: Send + Sync;

    /// An error which can occur while talking to the backend's store.
    type Error: std::error::Error + Send + Sync;

    /// Authenticates the given credentials with the backend.
    ///
    /// The outer result carries store failures, which fail the request. The
    /// inner result carries the verdict.
    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Result<Self::User, AuthFailure>, Self::Error>;

    /// Gets the user by provided ID from the backend.
    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error>;
}
