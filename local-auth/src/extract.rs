use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::{AuthSession, AuthnBackend};

// The auth session is put in place by `AuthManager`; a handler asking for one
// on a router without the auth layer is a wiring error, not a client error.
impl<S, Backend> FromRequestParts<S> for AuthSession<Backend>
where
    S: Send + Sync,
    Backend: AuthnBackend + 'static,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession<Backend>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("auth session not found in request extensions");
                StatusCode::INTERNAL_SERVER_ERROR
            })
    }
}
