use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::http::{Request, Response, StatusCode};
use tower::{Layer, Service};
use tower_sessions::{
    service::{CookieController, PlaintextCookie},
    Session, SessionManagerLayer, SessionStore,
};
use tracing::Instrument;

use crate::{
    codec::{self, SessionToken},
    session::Error,
    AuthSession, AuthUser, AuthnBackend, UserId,
};

/// Session key the [`SessionToken`] is stored under unless configured
/// otherwise.
pub const DEFAULT_DATA_KEY: &str = "local-auth.token";

/// Resolves the token in `session` to the user it names.
///
/// A token that no longer resolves to a user is discarded together with the
/// rest of the session, so the request continues anonymously and the client
/// is handed a fresh session. Store and session I/O errors are returned.
pub(crate) async fn restore<Backend: AuthnBackend>(
    session: Session,
    backend: Backend,
    data_key: &'static str,
) -> Result<AuthSession<Backend>, Error<Backend>> {
    let token: Option<SessionToken<UserId<Backend>>> =
        session.get(data_key).await.map_err(Error::Session)?;

    let restored = match token {
        None => None,
        Some(token) => match codec::deserialize(&backend, &token)
            .await
            .map_err(Error::Backend)?
        {
            Ok(user) => Some((user, token)),
            Err(failure) => {
                tracing::info!(failure = ?failure, "discarding session");
                session.flush().await.map_err(Error::Session)?;
                None
            }
        },
    };

    Ok(AuthSession::new(session, backend, data_key, restored))
}

/// A middleware that restores the logged-in user from the session and
/// provides [`AuthSession`] as a request extension.
///
/// Requests without a session, or whose user cannot be loaded because the
/// session store or the backend failed, are answered with `500` without
/// reaching the inner service.
#[derive(Debug, Clone)]
pub struct AuthManager<S, Backend: AuthnBackend> {
    inner: S,
    backend: Backend,
    data_key: &'static str,
}

impl<S, Backend: AuthnBackend> AuthManager<S, Backend> {
    /// Wraps `inner`, restoring users through `backend` from `data_key`.
    pub fn new(inner: S, backend: Backend, data_key: &'static str) -> Self {
        Self {
            inner,
            backend,
            data_key,
        }
    }
}

fn internal_error<ResBody: Default>() -> Response<ResBody> {
    let mut res = Response::default();
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}

impl<ReqBody, ResBody, S, Backend> Service<Request<ReqBody>> for AuthManager<S, Backend>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    Backend: AuthnBackend + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let span = tracing::info_span!("call", user.id = tracing::field::Empty);

        let backend = self.backend.clone();
        let data_key = self.data_key;

        // Only the service that was polled ready may be called; the clone takes
        // its place for the next request.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(
            async move {
                let Some(session) = req.extensions().get::<Session>().cloned() else {
                    tracing::error!("session not found in request extensions");
                    return Ok(internal_error());
                };

                let auth_session = match restore(session, backend, data_key).await {
                    Ok(auth_session) => auth_session,
                    Err(Error::Backend(err)) => {
                        tracing::error!(err = %err, "could not load the session's user");
                        return Ok(internal_error());
                    }
                    Err(err) => {
                        tracing::error!(err = %err, "could not read the session");
                        return Ok(internal_error());
                    }
                };

                if let Some(ref user) = auth_session.user {
                    tracing::Span::current().record("user.id", user.id().to_string());
                }

                req.extensions_mut().insert(auth_session);

                inner.call(req).await
            }
            .instrument(span),
        )
    }
}

/// A layer installing the session layer and, inside it, [`AuthManager`].
#[derive(Debug, Clone)]
pub struct AuthManagerLayer<
    Backend: AuthnBackend,
    Sessions: SessionStore,
    C: CookieController = PlaintextCookie,
> {
    backend: Backend,
    session_manager_layer: SessionManagerLayer<Sessions, C>,
    data_key: &'static str,
}

impl<S, Backend: AuthnBackend, Sessions: SessionStore, C: CookieController> Layer<S>
    for AuthManagerLayer<Backend, Sessions, C>
{
    type Service = <SessionManagerLayer<Sessions, C> as Layer<AuthManager<S, Backend>>>::Service;

    fn layer(&self, inner: S) -> Self::Service {
        let auth_manager = AuthManager::new(inner, self.backend.clone(), self.data_key);
        self.session_manager_layer.layer(auth_manager)
    }
}

/// Builder for the [`AuthManagerLayer`].
#[derive(Debug, Clone)]
pub struct AuthManagerLayerBuilder<
    Backend: AuthnBackend,
    Sessions: SessionStore,
    C: CookieController = PlaintextCookie,
> {
    backend: Backend,
    session_manager_layer: SessionManagerLayer<Sessions, C>,
    data_key: &'static str,
}

impl<Backend: AuthnBackend, Sessions: SessionStore, C: CookieController>
    AuthManagerLayerBuilder<Backend, Sessions, C>
{
    /// Starts a builder restoring users through `backend` from sessions
    /// provided by `session_manager_layer`.
    pub fn new(backend: Backend, session_manager_layer: SessionManagerLayer<Sessions, C>) -> Self {
        Self {
            backend,
            session_manager_layer,
            data_key: DEFAULT_DATA_KEY,
        }
    }

    /// Stores the token under `data_key` instead of [`DEFAULT_DATA_KEY`].
    pub fn with_data_key(mut self, data_key: &'static str) -> Self {
        self.data_key = data_key;
        self
    }

    /// Build the [`AuthManagerLayer`].
    pub fn build(self) -> AuthManagerLayer<Backend, Sessions, C> {
        AuthManagerLayer {
            backend: self.backend,
            session_manager_layer: self.session_manager_layer,
            data_key: self.data_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, Response, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use tower_sessions::{cookie::Cookie, MemoryStore as SessionMemoryStore};

    use super::*;
    use crate::{
        hasher::PasswordHasher,
        store::MemoryStore,
        users::{self, Backend, Credentials},
    };

    fn get_session_cookie(res: &Response<Body>) -> Option<String> {
        res.headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|cookie_str| Cookie::parse(cookie_str).ok())
            .map(|c| format!("{}={}", c.name(), c.value()))
    }

    async fn app(data_key: Option<&'static str>) -> Router {
        let backend = Backend::new(MemoryStore::new(), PasswordHasher::new(4));
        backend
            .signup(Credentials {
                username: "ferris".into(),
                password: "hunter42".into(),
            })
            .await
            .unwrap()
            .unwrap();

        let session_layer = SessionManagerLayer::new(SessionMemoryStore::default()).with_secure(false);
        let mut builder = AuthManagerLayerBuilder::new(backend, session_layer);
        if let Some(data_key) = data_key {
            builder = builder.with_data_key(data_key);
        }

        Router::new()
            .route(
                "/",
                get(|auth_session: users::AuthSession| async move {
                    match auth_session.user {
                        Some(user) => (StatusCode::OK, user.username),
                        None => (StatusCode::UNAUTHORIZED, String::new()),
                    }
                }),
            )
            .route(
                "/login",
                get(|mut auth_session: users::AuthSession| async move {
                    let user = auth_session
                        .authenticate(Credentials {
                            username: "ferris".into(),
                            password: "hunter42".into(),
                        })
                        .await
                        .unwrap();
                    auth_session.login(&user).await.unwrap();
                }),
            )
            .layer(builder.build())
    }

    async fn login_and_fetch(app: Router) -> StatusCode {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/login")
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let session_cookie =
            get_session_cookie(&res).expect("Response should have a valid session cookie");

        let req = Request::builder()
            .uri("/")
            .header(header::COOKIE, session_cookie)
            .body(Body::empty())
            .unwrap();
        app.oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_session_restores_user() {
        assert_eq!(login_and_fetch(app(None).await).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_custom_data_key() {
        assert_eq!(
            login_and_fetch(app(Some("custom.token")).await).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_missing_session_layer() {
        let backend = Backend::new(MemoryStore::new(), PasswordHasher::new(4));
        let svc = AuthManager::new(
            tower::service_fn(|_: Request<Body>| async {
                Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
            }),
            backend,
            DEFAULT_DATA_KEY,
        );

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = svc.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_extractor_without_auth_layer() {
        let app = Router::new().route(
            "/",
            get(|_: users::AuthSession| async { StatusCode::OK }),
        );

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
