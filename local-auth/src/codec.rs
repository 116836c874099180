//! Mapping between users and the token kept in their session.

use serde::{Deserialize, Serialize};

use crate::{AuthFailure, AuthUser, AuthnBackend, UserId};

/// An opaque reference to a user, carried in the session across requests.
///
/// The token holds the user's ID and nothing else: no password material ever
/// reaches the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken<Id> {
    user_id: Id,
}

/// Maps a user to its session token.
pub fn serialize<User: AuthUser>(user: &User) -> SessionToken<User::Id> {
    SessionToken { user_id: user.id() }
}

/// Resolves a session token to the current user record.
///
/// The user is always re-fetched from the backend, so a deleted account is
/// observed on the next request as [`AuthFailure::SessionInvalid`].
pub async fn deserialize<Backend: AuthnBackend>(
    backend: &Backend,
    token: &SessionToken<UserId<Backend>>,
) -> Result<Result<Backend::User, AuthFailure>, Backend::Error> {
    let user = backend.get_user(&token.user_id).await?;
    Ok(user.ok_or(AuthFailure::SessionInvalid))
}
