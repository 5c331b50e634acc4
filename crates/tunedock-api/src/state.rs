//! Application state shared across handlers.
//!
//! Handlers see trait objects only; the concrete Postgres and object-store
//! backends are chosen at startup in [setup](crate::setup). Config values the
//! router or a handler needs at request time are copied in here so the state
//! is constructible without an environment.

use std::path::PathBuf;
use std::sync::Arc;
use tunedock_core::{IdentityStore, MetadataStore};
use tunedock_storage::ObjectStore;
use tunedock_worker::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub metadata: Arc<dyn MetadataStore>,
    pub identity: Arc<dyn IdentityStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub orchestrator: Orchestrator,
    /// Root of the per-owner scratch tree jobs download into.
    pub scratch_root: PathBuf,
    /// Token authorizing owner reassignment; `None` disables the endpoint.
    pub admin_token: Option<String>,
    pub cors_origins: Vec<String>,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
