use anyhow::{Context, Result};
use axum::Router;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod auth;
mod client;
mod commands;
mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod transform;

use config::{AppConfig, Command};
use services::{
    media_processor::CloudinaryClient,
    media_store::{self, SqliteMediaStore},
    upload_service::UploadService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + command ---
    let (cfg, command) = AppConfig::from_env_and_args()?;

    match command {
        Command::Migrate => {
            let db = connect(&cfg.database_url).await?;
            let applied = media_store::migrate(&db).await?;
            tracing::info!("Database migration complete ({} statements).", applied);
            Ok(())
        }
        Command::Serve => serve(cfg).await,
        client_command => commands::run(&cfg, client_command).await,
    }
}

async fn serve(cfg: AppConfig) -> Result<()> {
    tracing::info!("Starting media-studio with config: {:?}", cfg);

    // Fail before binding when credentials are missing.
    let provider = cfg.provider()?;
    let secret = cfg.auth_secret()?;

    let db = Arc::new(connect(&cfg.database_url).await?);
    // The schema is idempotent; serving an unmigrated file just works.
    media_store::migrate(&db).await?;

    // --- Initialize core services ---
    let uploads = UploadService::new(
        Arc::new(SqliteMediaStore::new(db.clone())),
        Arc::new(CloudinaryClient::new(provider)),
    );
    let state = state::AppState {
        uploads,
        verifier: Arc::new(auth::TokenVerifier::new(secret.expose().as_bytes())),
    };

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the SQLite pool, creating the database file and its directory.
async fn connect(db_url: &str) -> Result<SqlitePool> {
    tracing::debug!("Connecting using raw URL => {}", db_url);

    // Extract the local file path SQLx will use
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");

    if !db_path.starts_with(":memory:") {
        let db_path = Path::new(db_path);
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }

        // SQLx will not create the file itself without `mode=rwc`.
        if let Err(e) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(db_path)
        {
            tracing::warn!("Failed to open file manually: {}", e);
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .with_context(|| format!("connecting to {}", db_url))?;
    Ok(pool)
}
