//! The HTTP surface: sign up, log in, log out, and the landing page.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_messages::Messages;

pub use app::{router, App};
pub use auth::LOGIN_FAILED;

mod app;
mod auth;
mod home;

// Drains the messages queued by the previous request.
fn pending(messages: Messages) -> Vec<String> {
    messages.into_iter().map(|message| message.message).collect()
}

fn internal_error(err: impl std::fmt::Display, context: &'static str) -> Response {
    tracing::error!(err = %err, "{context}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

fn render(template: impl Template) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => internal_error(err, "could not render template"),
    }
}
