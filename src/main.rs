use anyhow::Context;
use findme::{auth, db, AppState, Config};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("findme=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(config.session_idle));

    let connect_options: SqliteConnectOptions = config.database_url.parse()
        .with_context(|| format!("bad DATABASE_URL {}", config.database_url))?;
    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(connect_options.create_if_missing(true).foreign_keys(true))
        .await?;
    db::migrate(&db_pool).await?;

    let secrets = std::fs::read_to_string(&config.client_secrets)
        .with_context(|| format!("reading {}", config.client_secrets.display()))?;
    let secrets: serde_json::Value = serde_json::from_str(&secrets)?;
    let clients = auth::Clients::from_json(&secrets, &config.public_url)?;
    let identity = auth::Identity::from_json(&secrets)?;

    let bind_addr = config.bind_addr.clone();
    let app = findme::router()
        .with_state(AppState::new(db_pool, clients, identity, config))
        .layer(session_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
