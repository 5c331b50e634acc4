//! Persistence traits for jobs and the owner identity.
//!
//! The conversion pipeline and the API only ever talk to these traits;
//! concrete backends (Postgres, in-memory test doubles) implement them.

use crate::models::{Job, JobStatus, NewJob};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Durable job records.
///
/// Transition methods are guarded: a call that would move a job backward,
/// re-enter a terminal state, or lower progress affects nothing and reports
/// `false`. The orchestrator is the only caller of the mutating methods
/// after creation.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a new job in `Queued` at progress 0 and return the stored row.
    async fn insert(&self, new_job: &NewJob) -> StoreResult<Job>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Job>>;

    async fn list_all(&self) -> StoreResult<Vec<Job>>;

    async fn list_for_requester(&self, requester_id: &str) -> StoreResult<Vec<Job>>;

    /// All jobs with `status == Completed`, newest first.
    async fn list_completed(&self) -> StoreResult<Vec<Job>>;

    /// Every job (any status) filed under `folder`. Used by folder deletion.
    async fn list_in_folder(&self, folder: &str) -> StoreResult<Vec<Job>>;

    /// Best-effort duplicate probe: any non-Error job with this exact
    /// source URL. Failed jobs are ignored so a URL can be resubmitted.
    async fn find_conflict(&self, source_url: &str) -> StoreResult<Option<Job>>;

    /// Move a job from `from` to `to`, writing the milestone progress.
    /// Sets `started_at` (once) when entering `Downloading`. Returns whether
    /// a row was actually transitioned.
    async fn advance(&self, id: Uuid, from: JobStatus, to: JobStatus) -> StoreResult<bool>;

    /// Merge fetched media details into a job. No status change.
    async fn set_media_details(
        &self,
        id: Uuid,
        title: Option<&str>,
        thumbnail_ref: Option<&str>,
        duration_seconds: Option<i32>,
    ) -> StoreResult<()>;

    /// Terminal success: records the durable reference, key and size,
    /// moves `Uploading -> Completed` and stamps `finished_at` once.
    async fn complete(
        &self,
        id: Uuid,
        storage_key: &str,
        artifact_ref: &str,
        file_size_bytes: i64,
    ) -> StoreResult<bool>;

    /// Terminal failure from any non-terminal state. Progress is left where
    /// it was; the message is stored bounded.
    async fn fail(&self, id: Uuid, message: &str) -> StoreResult<bool>;

    /// Remove a job record outright (library deletion, not a transition).
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Connectivity probe for the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

/// The single persisted owner identity, with compare-and-set installation.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn current(&self) -> StoreResult<Option<String>>;

    /// Install `candidate` as owner if none is persisted; returns the
    /// winning identity either way. Safe under concurrent first callers.
    async fn install_if_absent(&self, candidate: &str) -> StoreResult<String>;

    /// Privileged overwrite of the owner identity.
    async fn reassign(&self, identity: &str) -> StoreResult<()>;

    /// First-caller-wins ownership check: installs `identity` when no owner
    /// exists yet, then compares.
    async fn is_owner(&self, identity: &str) -> StoreResult<bool> {
        Ok(self.install_if_absent(identity).await? == identity)
    }
}
