use askama::Template;
use axum::{response::IntoResponse, routing::get, Router};
use axum_messages::Messages;

use crate::{
    users::AuthSession,
    web::{pending, render},
};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    username: Option<String>,
    messages: Vec<String>,
}

pub fn router() -> Router<()> {
    Router::new().route("/", get(self::get::index))
}

mod get {
    use super::*;

    pub async fn index(auth_session: AuthSession, messages: Messages) -> impl IntoResponse {
        render(IndexTemplate {
            username: auth_session.user.map(|user| user.username),
            messages: pending(messages),
        })
    }
}
