//! Run with
//!
//! ```not_rust
//! MONGODB_URI=mongodb://localhost:27017/members SESSION_SECRET=... cargo run -p local-auth
//! ```
use local_auth::{config::Config, web::App};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
            |_| "local_auth=debug,tower_sessions=debug,mongodb=warn".into(),
        )))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    let config = Config::from_env()?;

    App::new(config).await?.serve().await
}
