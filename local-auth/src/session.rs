use std::fmt::Debug;

use tower_sessions::{session, Session};

use crate::{
    backend::{AuthFailure, AuthUser, UserId},
    codec::{self, SessionToken},
    AuthnBackend,
};

/// An error type which maps session and backend errors.
#[derive(thiserror::Error)]
pub enum Error<Backend: AuthnBackend> {
    /// A mapping to `tower_sessions::session::Error'.
    #[error(transparent)]
    Session(session::Error),

    /// A mapping to `Backend::Error`.
    #[error(transparent)]
    Backend(Backend::Error),

    /// The credentials or the session did not resolve to a user.
    #[error(transparent)]
    Failure(AuthFailure),
}

impl<Backend: AuthnBackend> Debug for Error<Backend> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Session(err) => write!(f, "{:?}", err)?,
            Error::Backend(err) => write!(f, "{:?}", err)?,
            Error::Failure(failure) => write!(f, "{:?}", failure)?,
        };

        Ok(())
    }
}

/// A specialized session for identification and authentication of users
/// associated with a backend.
///
/// The session is generic over some backend which implements [`AuthnBackend`].
///
/// Methods for authenticating the session and logging a user in are provided.
///
/// Generally this session will be used in the context of some authentication
/// workflow, for example via a frontend login form. There a user would provide
/// their credentials, such as username and password, and via the backend
/// the session would authenticate those credentials.
///
/// Once the supplied credentials have been authenticated, a user will be
/// returned. When we do have a user, it's then possible to set the state of
/// the session so that the user is logged in. Only the user's ID is written to
/// the session; on every later request the user is loaded afresh from the
/// backend.
#[derive(Debug, Clone)]
pub struct AuthSession<Backend: AuthnBackend> {
    /// The user associated by the backend. `None` when not logged in.
    pub user: Option<Backend::User>,

    /// The authentication backend.
    pub backend: Backend,

    token: Option<SessionToken<UserId<Backend>>>,
    session: Session,
    data_key: &'static str,
}

impl<Backend: AuthnBackend> AuthSession<Backend> {
    /// Verifies the provided credentials via the backend returning the
    /// authenticated user if valid.
    ///
    /// Invalid credentials are reported as [`Error::Failure`].
    #[tracing::instrument(level = "debug", skip_all, fields(user.id), ret, err)]
    pub async fn authenticate(
        &self,
        creds: Backend::Credentials,
    ) -> Result<Backend::User, Error<Backend>> {
        let user = self
            .backend
            .authenticate(creds)
            .await
            .map_err(Error::Backend)?
            .map_err(Error::Failure)?;

        tracing::Span::current().record("user.id", user.id().to_string());

        Ok(user)
    }

    /// Updates the session such that the user is logged in.
    #[tracing::instrument(level = "debug", skip_all, fields(user.id = user.id().to_string()), ret, err)]
    pub async fn login(&mut self, user: &Backend::User) -> Result<(), Error<Backend>> {
        if self.token.is_none() {
            self.session.cycle_id().await.map_err(Error::Session)?; // Session-fixation mitigation.
        }

        let token = codec::serialize(user);
        self.session
            .insert(self.data_key, &token)
            .await
            .map_err(Error::Session)?;

        self.token = Some(token);
        self.user = Some(user.clone());

        Ok(())
    }

    /// Updates the session such that the user is logged out.
    ///
    /// Logging out an anonymous session is a no-op apart from flushing it.
    #[tracing::instrument(level = "debug", skip_all, fields(user.id), ret, err)]
    pub async fn logout(&mut self) -> Result<Option<Backend::User>, Error<Backend>> {
        let user = self.user.take();

        if let Some(ref user) = user {
            tracing::Span::current().record("user.id", user.id().to_string());
        }

        self.token = None;
        self.session.flush().await.map_err(Error::Session)?;

        Ok(user)
    }

    /// Resolves the session's token to the current user record.
    ///
    /// Unlike [`user`](Self::user), which is loaded once per request, this
    /// re-reads the session and the backend. A session without a token, or
    /// whose user no longer exists, fails with [`AuthFailure::SessionInvalid`].
    pub async fn current(&self) -> Result<Backend::User, Error<Backend>> {
        let token: Option<SessionToken<UserId<Backend>>> = self
            .session
            .get(self.data_key)
            .await
            .map_err(Error::Session)?;

        let Some(token) = token else {
            return Err(Error::Failure(AuthFailure::SessionInvalid));
        };

        codec::deserialize(&self.backend, &token)
            .await
            .map_err(Error::Backend)?
            .map_err(Error::Failure)
    }

    /// Assembles an auth session from a restored user and its token, or an
    /// anonymous one when `restored` is `None`.
    pub(crate) fn new(
        session: Session,
        backend: Backend,
        data_key: &'static str,
        restored: Option<(Backend::User, SessionToken<UserId<Backend>>)>,
    ) -> Self {
        let (user, token) = match restored {
            Some((user, token)) => (Some(user), Some(token)),
            None => (None, None),
        };

        Self {
            user,
            backend,
            token,
            session,
            data_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore as SessionMemoryStore;

    use super::*;
    use crate::{
        hasher::PasswordHasher,
        service::restore,
        store::MemoryStore,
        users::{Backend, Credentials, User},
    };

    const DATA_KEY: &str = "test.token";

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn session() -> Session {
        Session::new(None, Arc::new(SessionMemoryStore::default()), None)
    }

    async fn setup() -> (Backend, MemoryStore, User) {
        let store = MemoryStore::new();
        let backend = Backend::new(store.clone(), PasswordHasher::new(4));
        let user = backend
            .signup(creds("alice", "secret1"))
            .await
            .unwrap()
            .unwrap();
        (backend, store, user)
    }

    #[tokio::test]
    async fn test_anonymous_session() {
        let (backend, _, _) = setup().await;
        let auth_session = restore(session(), backend, DATA_KEY)
            .await
            .unwrap();

        assert!(auth_session.user.is_none());
        assert!(matches!(
            auth_session.current().await,
            Err(Error::Failure(AuthFailure::SessionInvalid))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_failures() {
        let (backend, _, _) = setup().await;
        let auth_session = restore(session(), backend, DATA_KEY)
            .await
            .unwrap();

        let user = auth_session
            .authenticate(creds("alice", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        assert!(matches!(
            auth_session.authenticate(creds("alice", "wrong")).await,
            Err(Error::Failure(AuthFailure::BadPassword))
        ));
        assert!(matches!(
            auth_session.authenticate(creds("bob", "x")).await,
            Err(Error::Failure(AuthFailure::UnknownUser))
        ));
    }

    #[tokio::test]
    async fn test_login_is_restored() {
        let (backend, _, user) = setup().await;
        let session = session();

        let mut auth_session = restore(session.clone(), backend.clone(), DATA_KEY)
            .await
            .unwrap();
        auth_session.login(&user).await.unwrap();
        assert_eq!(auth_session.user.as_ref(), Some(&user));

        let restored = restore(session, backend, DATA_KEY)
            .await
            .unwrap();
        assert_eq!(restored.user, Some(user.clone()));
        assert_eq!(restored.current().await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let (backend, _, user) = setup().await;
        let session = session();

        let mut auth_session = restore(session.clone(), backend.clone(), DATA_KEY)
            .await
            .unwrap();
        auth_session.login(&user).await.unwrap();

        let logged_out = auth_session.logout().await.unwrap();
        assert_eq!(logged_out, Some(user));
        assert!(auth_session.user.is_none());
        assert!(matches!(
            auth_session.current().await,
            Err(Error::Failure(AuthFailure::SessionInvalid))
        ));

        let restored = restore(session, backend, DATA_KEY)
            .await
            .unwrap();
        assert!(restored.user.is_none());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (backend, _, user) = setup().await;
        let mut auth_session = restore(session(), backend, DATA_KEY)
            .await
            .unwrap();
        auth_session.login(&user).await.unwrap();

        assert!(auth_session.logout().await.unwrap().is_some());
        assert!(auth_session.logout().await.unwrap().is_none());
        assert!(auth_session.user.is_none());
    }

    #[tokio::test]
    async fn test_deleted_user_is_logged_out() {
        let (backend, store, user) = setup().await;
        let session = session();

        let mut auth_session = restore(session.clone(), backend.clone(), DATA_KEY)
            .await
            .unwrap();
        auth_session.login(&user).await.unwrap();

        store.remove(&user.id()).await;

        assert!(matches!(
            auth_session.current().await,
            Err(Error::Failure(AuthFailure::SessionInvalid))
        ));

        let restored = restore(session.clone(), backend, DATA_KEY)
            .await
            .unwrap();
        assert!(restored.user.is_none());

        let token: Option<SessionToken<UserId<Backend>>> = session.get(DATA_KEY).await.unwrap();
        assert!(token.is_none());
    }
}
