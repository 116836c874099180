//! Username and password authentication with sessions for Axum.
//!
//! This crate provides a Tower middleware which restores an authenticated user
//! from the session on every request, plus the pieces around it needed to
//! sign users up, log them in, and log them out:
//!
//! 1. A [`CredentialStore`](store::CredentialStore) persisting users, backed
//!    by MongoDB ([`MongoStore`](store::MongoStore)) or memory
//!    ([`MemoryStore`](store::MemoryStore)),
//! 2. A bcrypt [`PasswordHasher`](hasher::PasswordHasher),
//! 3. An authentication strategy, expressed as the [`AuthnBackend`] trait and
//!    implemented for username and password by [`users::Backend`],
//! 4. A session identity codec mapping users to a [`SessionToken`] holding
//!    only their ID, and back,
//! 5. An axum router serving the sign up, log in, and log out routes.
//!
//! Sessions are provided via [`tower-sessions`](tower_sessions). The session
//! layer is installed by [`AuthManagerLayer`] itself, before the auth
//! manager, as the session will be used internally to store the token.
//!
//! # Example
//!
//! ```rust,no_run
//! use local_auth::{hasher::PasswordHasher, store::MemoryStore, users::Backend, web};
//! use tower_sessions::cookie::Key;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Backend::new(MemoryStore::new(), PasswordHasher::default());
//!     let app = web::router(backend, Key::generate());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app.into_make_service()).await?;
//!
//!     Ok(())
//! }
//! ```
#![warn(
    clippy::all,
    nonstandard_style,
    future_incompatible,
    missing_debug_implementations,
    missing_docs
)]
#![forbid(unsafe_code)]

pub use backend::{AuthFailure, AuthUser, AuthnBackend, UserId};
pub use codec::SessionToken;
pub use service::{AuthManager, AuthManagerLayer, AuthManagerLayerBuilder, DEFAULT_DATA_KEY};
pub use session::{AuthSession, Error};
pub use tower_sessions;

mod backend;
pub mod codec;
pub mod config;
mod extract;
pub mod hasher;
mod service;
mod session;
pub mod store;
pub mod users;
pub mod web;
