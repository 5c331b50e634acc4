//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from
//! main.rs for better organization and testability.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tunedock_core::{Config, IdentityStore, MetadataStore};
use tunedock_db::{JobRepository, OwnerRepository};
use tunedock_media::{UploadManager, YtDlpFetcher};
use tunedock_worker::Orchestrator;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Initialize telemetry first
    crate::telemetry::init_telemetry();

    tracing::info!("Configuration loaded and validated successfully");

    // Setup database
    let pool = database::setup_database(&config).await?;

    // Setup storage
    let objects = storage::setup_storage(&config).await?;

    let metadata: Arc<dyn MetadataStore> = Arc::new(JobRepository::new(pool.clone()));
    let identity: Arc<dyn IdentityStore> = Arc::new(OwnerRepository::new(pool));

    let fetcher = Arc::new(YtDlpFetcher::new(
        config.ytdlp_path().to_string(),
        config.ffmpeg_path().map(String::from),
        Duration::from_secs(config.fetch_timeout_seconds()),
    ));
    let uploader = Arc::new(UploadManager::new(objects.clone()));

    let scratch_root = PathBuf::from(config.scratch_dir());
    let orchestrator = Orchestrator::new(
        metadata.clone(),
        identity.clone(),
        fetcher,
        uploader,
        config.max_concurrent_jobs(),
        scratch_root.clone(),
    );

    let state = Arc::new(AppState {
        metadata,
        identity,
        objects,
        orchestrator,
        scratch_root,
        admin_token: config.admin_token().map(String::from),
        cors_origins: config.cors_allowed_origins(),
    });

    // Setup routes
    let router = routes::setup_routes(state.clone())?;

    Ok((state, router))
}
