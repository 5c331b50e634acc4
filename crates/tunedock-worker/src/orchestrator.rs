//! Conversion orchestrator: one fire-and-forget task per accepted job.
//!
//! The request that created a job never waits on it. Each task claims its id
//! in the [`JobTracker`], acquires a concurrency permit (the job stays Queued
//! while waiting), then walks the pipeline strictly in order: Downloading,
//! Converting, Uploading, Completed. Every failure is caught at the task
//! boundary and recorded as the job's terminal Error state; the raw cause is
//! logged, never stored.

use crate::scratch;
use crate::tracker::JobTracker;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tunedock_core::models::{Job, JobStatus};
use tunedock_core::{IdentityStore, MetadataStore, StoreError};
use tunedock_media::{FetchRequest, MediaFetcher, UploadManager};
use tunedock_storage::keys;
use uuid::Uuid;

/// Everything the pipeline records when it gives up on a job.
struct PipelineFailure {
    client_message: String,
    detail: String,
}

impl PipelineFailure {
    fn new(client_message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            client_message: client_message.into(),
            detail: detail.into(),
        }
    }
}

impl From<StoreError> for PipelineFailure {
    fn from(err: StoreError) -> Self {
        Self::new("Failed to access database", err.to_string())
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    metadata: Arc<dyn MetadataStore>,
    identity: Arc<dyn IdentityStore>,
    fetcher: Arc<dyn MediaFetcher>,
    uploader: Arc<UploadManager>,
    tracker: JobTracker,
    semaphore: Arc<Semaphore>,
    scratch_root: PathBuf,
}

impl Orchestrator {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        identity: Arc<dyn IdentityStore>,
        fetcher: Arc<dyn MediaFetcher>,
        uploader: Arc<UploadManager>,
        max_concurrent_jobs: usize,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            metadata,
            identity,
            fetcher,
            uploader,
            tracker: JobTracker::new(),
            semaphore: Arc::new(Semaphore::new(max_concurrent_jobs)),
            scratch_root,
        }
    }

    /// How many pipeline tasks currently hold a tracker claim.
    pub fn active_jobs(&self) -> usize {
        self.tracker.running_count()
    }

    /// Schedule the pipeline for an accepted job.
    ///
    /// Returns `false` without spawning when a task for this id is already
    /// running. The permit is acquired inside the task so a queued job waits
    /// as Queued rather than blocking the caller.
    pub fn spawn(&self, job: Job) -> bool {
        let Some(guard) = self.tracker.begin(job.id) else {
            tracing::warn!(job_id = %job.id, "Conversion already running, refusing duplicate task");
            return false;
        };

        let orchestrator = self.clone();
        tokio::spawn(async move {
            let _guard = guard;

            let _permit = match orchestrator.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                // Closed semaphore means the process is shutting down.
                Err(_) => return,
            };

            orchestrator.run_pipeline(job).await;
        });

        true
    }

    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, url = %job.source_url))]
    async fn run_pipeline(&self, job: Job) {
        let job_id = job.id;
        match self.execute(job).await {
            Ok(()) => {}
            Err(failure) => {
                tracing::error!(
                    job_id = %job_id,
                    error = %failure.detail,
                    "Conversion pipeline failed"
                );
                self.record_failure(job_id, &failure.client_message).await;
            }
        }
    }

    async fn execute(&self, job: Job) -> Result<(), PipelineFailure> {
        // Ownership may have been reassigned between accept and run.
        let authorized = self.identity.is_owner(&job.requester_id).await?;
        if !authorized {
            return Err(PipelineFailure::new(
                "not authorized",
                format!("requester {} is no longer the owner", job.requester_id),
            ));
        }

        if !self
            .advance(job.id, JobStatus::Queued, JobStatus::Downloading)
            .await?
        {
            // Deleted or already moved by someone else; nothing to record.
            tracing::warn!(job_id = %job.id, "Job left Queued before the pipeline started, aborting");
            return Ok(());
        }

        let dest_dir = keys::scratch_dir(
            &self.scratch_root,
            &job.requester_id,
            job.folder.as_deref(),
        );

        let fetch_result = self
            .fetcher
            .fetch_and_transcode(&FetchRequest {
                source_url: job.source_url.clone(),
                bitrate_tier: job.bitrate_tier,
                dest_dir: dest_dir.clone(),
                job_id: job.id,
            })
            .await;

        // Sweep download byproducts whether the fetch worked or not.
        scratch::cleanup_sibling_artifacts(&dest_dir, job.id).await;

        let fetched = fetch_result
            .map_err(|e| PipelineFailure::new(e.client_message(), e.to_string()))?;

        self.metadata
            .set_media_details(
                job.id,
                fetched.title.as_deref(),
                fetched.thumbnail_ref.as_deref(),
                fetched.duration_seconds,
            )
            .await?;

        if !self
            .advance(job.id, JobStatus::Downloading, JobStatus::Converting)
            .await?
        {
            tracing::warn!(job_id = %job.id, "Job interfered with during download, aborting");
            return Ok(());
        }

        let artifact = fetched.artifact_path.clone();
        match tunedock_media::verify_mp3(&artifact).await {
            Ok(true) => {}
            Ok(false) => {
                scratch::remove_scratch_file(&artifact).await;
                return Err(PipelineFailure::new(
                    "Converted file failed validation and was discarded",
                    format!("artifact {} failed MP3 signature check", artifact.display()),
                ));
            }
            Err(e) => {
                scratch::remove_scratch_file(&artifact).await;
                return Err(PipelineFailure::new(
                    "Converted file failed validation and was discarded",
                    format!("could not read artifact {}: {}", artifact.display(), e),
                ));
            }
        }

        let file_size_bytes = tokio::fs::metadata(&artifact)
            .await
            .map(|m| m.len() as i64)
            .unwrap_or(0);

        if !self
            .advance(job.id, JobStatus::Converting, JobStatus::Uploading)
            .await?
        {
            tracing::warn!(job_id = %job.id, "Job interfered with during conversion, aborting");
            return Ok(());
        }

        let key = keys::object_key(&job.requester_id, job.folder.as_deref(), job.id);
        let stored = self
            .uploader
            .upload(&artifact, &key)
            .await
            .map_err(|e| PipelineFailure::new("Failed to store the converted file", e.to_string()))?;

        let completed = self
            .metadata
            .complete(job.id, &stored.storage_key, &stored.artifact_ref, file_size_bytes)
            .await?;
        if !completed {
            tracing::warn!(job_id = %job.id, "Job interfered with during upload, result not recorded");
            return Ok(());
        }

        // The durable copy is authoritative now.
        scratch::remove_scratch_file(&artifact).await;

        tracing::info!(
            job_id = %job.id,
            storage_key = %stored.storage_key,
            size_bytes = file_size_bytes,
            "Conversion completed"
        );

        Ok(())
    }

    async fn advance(
        &self,
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, PipelineFailure> {
        let moved = self.metadata.advance(job_id, from, to).await?;
        if moved {
            tracing::debug!(job_id = %job_id, from = %from, to = %to, "Job advanced");
        }
        Ok(moved)
    }

    async fn record_failure(&self, job_id: Uuid, client_message: &str) {
        match self.metadata.fail(job_id, client_message).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(job_id = %job_id, "Job already terminal, error not recorded");
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to record job error");
            }
        }
    }
}
