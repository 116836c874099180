use std::net::SocketAddr;

use axum::Router;
use axum_messages::MessagesManagerLayer;
use secrecy::ExposeSecret;
use time::Duration;
use tower_sessions::{cookie::Key, Expiry, MemoryStore, SessionManagerLayer};

use crate::{
    config::Config,
    store::MongoStore,
    users::Backend,
    web::{auth, home},
    AuthManagerLayerBuilder,
};

/// Builds the application router around the given backend.
///
/// Sessions live in memory and their cookie is signed with `session_key`.
pub fn router(backend: Backend, session_key: Key) -> Router {
    // Session layer.
    //
    // This uses `tower-sessions` to establish a layer that will provide the session
    // as a request extension.
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)))
        .with_signed(session_key);

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    // The messages layer reads and writes the session, so it sits inside the
    // auth layer that installs it.
    home::router()
        .merge(auth::router())
        .layer(MessagesManagerLayer)
        .layer(auth_layer)
}

/// The configured application, ready to serve.
pub struct App {
    backend: Backend,
    session_key: Key,
    bind_addr: SocketAddr,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("backend", &self.backend)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Connects to MongoDB and prepares the users collection.
    pub async fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let store = MongoStore::connect(
            config.mongodb_uri.expose_secret(),
            config.mongodb_database.as_deref(),
        )
        .await?;
        store.migrate().await?;

        Ok(Self {
            backend: Backend::new(store, config.hasher()),
            session_key: config.session_key(),
            bind_addr: config.bind_addr,
        })
    }

    /// Serves the application until the listener fails.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = router(self.backend, self.session_key);

        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "listening");
        axum::serve(listener, app.into_make_service()).await?;

        Ok(())
    }
}
