use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use salesboard::api::{self, AppState};
use salesboard::config::{Config, DatabaseBackend};
use salesboard::notifier::ChangeNotifier;
use salesboard::storage::{CachedStorage, PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("salesboard=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let backend: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(SqliteStorage::new(&config.database.url, config.database.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
    };

    info!("Initializing database...");
    backend.init().await?;
    info!("Database initialized successfully");

    let storage = Arc::new(CachedStorage::new(
        backend,
        config.report_cache.max_entries,
        config.report_cache.ttl_secs,
    ));

    let notifier = ChangeNotifier::new(config.notifier_interval(), config.notifier.channel_capacity);
    let notifier_task = notifier.start();
    info!(
        interval_secs = config.notifier_interval().as_secs(),
        "Change notifier started"
    );

    let state = Arc::new(AppState::new(
        storage.clone(),
        storage,
        Arc::clone(&notifier),
        config.query_timeout(),
    ));
    let router = api::create_api_router(state, config.client_url.as_deref());

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    notifier.shutdown();
    let _ = notifier_task.await;

    Ok(())
}
