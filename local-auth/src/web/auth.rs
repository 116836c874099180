use askama::Template;
use axum::{
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use axum_messages::Messages;

use crate::{
    session,
    users::{AuthSession, Credentials},
    web::{internal_error, pending, render},
};

/// Shown for both unknown usernames and wrong passwords, so the login form
/// does not reveal which usernames are registered.
pub const LOGIN_FAILED: &str = "Incorrect username or password.";

#[derive(Template)]
#[template(path = "sign-up-form.html")]
struct SignUpTemplate {
    messages: Vec<String>,
}

pub fn router() -> Router<()> {
    Router::new()
        .route("/sign-up", get(self::get::sign_up))
        .route("/sign-up", post(self::post::sign_up))
        .route("/log-in", post(self::post::log_in))
        .route("/log-out", get(self::get::log_out))
}

mod post {
    use super::*;

    pub async fn sign_up(
        mut auth_session: AuthSession,
        messages: Messages,
        Form(creds): Form<Credentials>,
    ) -> impl IntoResponse {
        let user = match auth_session.backend.signup(creds).await {
            Ok(Ok(user)) => user,
            Ok(Err(failure)) => {
                messages.error(failure.to_string());
                return Redirect::to("/sign-up").into_response();
            }
            Err(err) => return internal_error(err, "could not sign up user"),
        };

        if let Err(err) = auth_session.login(&user).await {
            return internal_error(err, "could not log in new user");
        }

        Redirect::to("/").into_response()
    }

    pub async fn log_in(
        mut auth_session: AuthSession,
        messages: Messages,
        Form(creds): Form<Credentials>,
    ) -> impl IntoResponse {
        let user = match auth_session.authenticate(creds).await {
            Ok(user) => user,
            Err(session::Error::Failure(failure)) => {
                tracing::debug!(%failure, "login rejected");
                messages.error(LOGIN_FAILED);
                return Redirect::to("/").into_response();
            }
            Err(err) => return internal_error(err, "could not authenticate user"),
        };

        if let Err(err) = auth_session.login(&user).await {
            return internal_error(err, "could not log in user");
        }

        Redirect::to("/").into_response()
    }
}

mod get {
    use super::*;

    pub async fn sign_up(messages: Messages) -> impl IntoResponse {
        render(SignUpTemplate {
            messages: pending(messages),
        })
    }

    pub async fn log_out(mut auth_session: AuthSession) -> impl IntoResponse {
        match auth_session.logout().await {
            Ok(_) => Redirect::to("/").into_response(),
            Err(err) => internal_error(err, "could not log out user"),
        }
    }
}
