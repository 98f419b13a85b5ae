//! Shopgram Commerce Service

use anyhow::Result;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopgram::auth::{AuthResolver, JwtKeys};
use shopgram::store::Stores;
use shopgram::{router, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "shopgram=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.expose_secret())
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let keys = JwtKeys::new(config.auth_secret.expose_secret().as_bytes(), config.token_ttl_hours);
    let auth = AuthResolver::new(keys, &config.session_cookie_name);
    let state = AppState::new(Stores::postgres(db), auth, &config.data_deletion_status_url);

    let addr = config.socket_addr();
    tracing::info!("Shopgram listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state)).await?;
    Ok(())
}
