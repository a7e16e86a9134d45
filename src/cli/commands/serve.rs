use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use crate::app::app;
use crate::cli::commands::admin::{ensure_admin, AdminOutcome, AdminSeed};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::state::AppState;

#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Bind address (overrides HOST)")]
    pub host: Option<String>,

    #[arg(long, help = "Listen port (overrides PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Keep all data in memory instead of PostgreSQL (lost on exit)")]
    pub memory: bool,
}

pub async fn serve(mut config: AppConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Starting backup manager in {:?} mode", config.environment);

    let store: Arc<dyn Store> = if args.memory {
        tracing::warn!("Using in-memory store; nothing will be persisted");
        let store = MemoryStore::new();
        seed_memory_admin(&store, config.security.bcrypt_cost).await?;
        Arc::new(store)
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::init_schema(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, store)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// An empty in-memory store has nobody who can log in, so seed the admin
/// from ADMIN_PASSWORD when it is set.
async fn seed_memory_admin(store: &MemoryStore, bcrypt_cost: u32) -> anyhow::Result<()> {
    if std::env::var("ADMIN_PASSWORD").is_err() {
        tracing::warn!("ADMIN_PASSWORD not set; the in-memory store starts without users");
        return Ok(());
    }
    let seed = AdminSeed::from_lookup(|key| std::env::var(key).ok())?;
    if let AdminOutcome::Created(user) = ensure_admin(store, seed, bcrypt_cost).await? {
        tracing::info!("Seeded in-memory admin '{}'", user.username);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
