//! Storage setup and initialization

use anyhow::Result;
use std::sync::Arc;
use tunedock_storage::{create_object_store, ObjectStore};

use tunedock_core::Config;

/// Setup the object store backing the track library.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    tracing::info!("Initializing storage abstraction...");
    let store = create_object_store(config).await?;
    tracing::info!(
        backend = ?store.backend(),
        "Storage abstraction initialized successfully"
    );

    Ok(store)
}
