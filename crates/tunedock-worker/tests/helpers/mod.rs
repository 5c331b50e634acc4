//! Test doubles for the conversion pipeline: in-memory stores that honor the
//! same transition guards as the Postgres repositories, plus canned fetchers.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tunedock_core::models::{Job, JobStatus, NewJob};
use tunedock_core::sanitize::truncate_message;
use tunedock_core::{IdentityStore, MetadataStore, StoreResult};
use tunedock_media::{FetchError, FetchRequest, FetchedMedia, MediaFetcher};
use tunedock_storage::{ObjectStore, ObjectStream, StorageBackend, StorageError, StorageResult};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryMetadataStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Job>> {
        self.jobs.lock().unwrap()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn insert(&self, new_job: &NewJob) -> StoreResult<Job> {
        let job = Job {
            id: new_job.id,
            requester_id: new_job.requester_id.clone(),
            source_url: new_job.source_url.clone(),
            folder: new_job.folder.clone(),
            bitrate_tier: new_job.bitrate_tier,
            status: JobStatus::Queued,
            progress: 0,
            title: None,
            thumbnail_ref: None,
            duration_seconds: None,
            file_size_bytes: None,
            storage_key: None,
            artifact_ref: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        self.lock().insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self.lock().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn list_for_requester(&self, requester_id: &str) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .lock()
            .values()
            .filter(|j| j.requester_id == requester_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn list_completed(&self) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .lock()
            .values()
            .filter(|j| j.status == JobStatus::Completed)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn list_in_folder(&self, folder: &str) -> StoreResult<Vec<Job>> {
        Ok(self
            .lock()
            .values()
            .filter(|j| j.folder.as_deref() == Some(folder))
            .cloned()
            .collect())
    }

    async fn find_conflict(&self, source_url: &str) -> StoreResult<Option<Job>> {
        Ok(self
            .lock()
            .values()
            .find(|j| j.source_url == source_url && j.status != JobStatus::Error)
            .cloned())
    }

    async fn advance(&self, id: Uuid, from: JobStatus, to: JobStatus) -> StoreResult<bool> {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(false);
        };
        if job.status != from || !from.can_transition_to(to) {
            return Ok(false);
        }

        job.status = to;
        if let Some(milestone) = to.milestone() {
            job.progress = job.progress.max(milestone);
        }
        if to == JobStatus::Downloading && job.started_at.is_none() {
            job.started_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn set_media_details(
        &self,
        id: Uuid,
        title: Option<&str>,
        thumbnail_ref: Option<&str>,
        duration_seconds: Option<i32>,
    ) -> StoreResult<()> {
        let mut jobs = self.lock();
        if let Some(job) = jobs.get_mut(&id) {
            job.title = title.map(String::from);
            job.thumbnail_ref = thumbnail_ref.map(String::from);
            job.duration_seconds = duration_seconds;
        }
        Ok(())
    }

    async fn complete(
        &self,
        id: Uuid,
        storage_key: &str,
        artifact_ref: &str,
        file_size_bytes: i64,
    ) -> StoreResult<bool> {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(false);
        };
        if job.status != JobStatus::Uploading {
            return Ok(false);
        }

        job.status = JobStatus::Completed;
        job.progress = 100;
        job.storage_key = Some(storage_key.to_string());
        job.artifact_ref = Some(artifact_ref.to_string());
        job.file_size_bytes = Some(file_size_bytes);
        if job.finished_at.is_none() {
            job.finished_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn fail(&self, id: Uuid, message: &str) -> StoreResult<bool> {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(false);
        };
        if job.status.is_terminal() {
            return Ok(false);
        }

        job.status = JobStatus::Error;
        job.error_message = Some(truncate_message(message));
        if job.finished_at.is_none() {
            job.finished_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.lock().remove(&id).is_some())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryIdentityStore {
    owner: Mutex<Option<String>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(identity: &str) -> Self {
        Self {
            owner: Mutex::new(Some(identity.to_string())),
        }
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn current(&self) -> StoreResult<Option<String>> {
        Ok(self.owner.lock().unwrap().clone())
    }

    async fn install_if_absent(&self, candidate: &str) -> StoreResult<String> {
        let mut owner = self.owner.lock().unwrap();
        match owner.as_ref() {
            Some(existing) => Ok(existing.clone()),
            None => {
                *owner = Some(candidate.to_string());
                Ok(candidate.to_string())
            }
        }
    }

    async fn reassign(&self, identity: &str) -> StoreResult<()> {
        *self.owner.lock().unwrap() = Some(identity.to_string());
        Ok(())
    }
}

/// Fetcher that "downloads" by writing a valid MP3 artifact plus the kind of
/// sibling byproduct yt-dlp leaves behind.
pub struct StubFetcher {
    pub title: &'static str,
    pub duration_seconds: i32,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            title: "Stub Song",
            duration_seconds: 180,
        }
    }
}

#[async_trait]
impl MediaFetcher for StubFetcher {
    async fn fetch_and_transcode(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchedMedia, FetchError> {
        tokio::fs::create_dir_all(&request.dest_dir).await?;

        let sibling = request.dest_dir.join(format!("{}.webm", request.job_id));
        tokio::fs::write(&sibling, b"container bytes").await?;

        let artifact_path = request.dest_dir.join(format!("{}.mp3", request.job_id));
        tokio::fs::write(&artifact_path, b"ID3\x04\x00fake audio frames").await?;

        Ok(FetchedMedia {
            artifact_path,
            title: Some(self.title.to_string()),
            thumbnail_ref: Some("https://thumbs.test/cover.jpg".to_string()),
            duration_seconds: Some(self.duration_seconds),
        })
    }
}

/// Fetcher that blocks until the test hands it a permit, so a test can hold a
/// job mid-download and observe the tracker while it runs.
pub struct GateFetcher {
    gate: Arc<Semaphore>,
    inner: StubFetcher,
}

impl GateFetcher {
    pub fn new() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let fetcher = Self {
            gate: gate.clone(),
            inner: StubFetcher::new(),
        };
        (fetcher, gate)
    }
}

#[async_trait]
impl MediaFetcher for GateFetcher {
    async fn fetch_and_transcode(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchedMedia, FetchError> {
        self.gate.acquire().await.expect("gate closed").forget();
        self.inner.fetch_and_transcode(request).await
    }
}

/// Fetcher that always fails with a fixed classified error.
pub struct FailingFetcher;

#[async_trait]
impl MediaFetcher for FailingFetcher {
    async fn fetch_and_transcode(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchedMedia, FetchError> {
        tokio::fs::create_dir_all(&request.dest_dir).await?;
        // Leave a partial download behind, like a real aborted fetch.
        let partial = request.dest_dir.join(format!("{}.webm.part", request.job_id));
        tokio::fs::write(&partial, b"partial").await?;

        Err(FetchError::Unavailable("Video unavailable".to_string()))
    }
}

/// Fetcher that produces an artifact which is not an MP3.
pub struct CorruptFetcher;

#[async_trait]
impl MediaFetcher for CorruptFetcher {
    async fn fetch_and_transcode(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchedMedia, FetchError> {
        tokio::fs::create_dir_all(&request.dest_dir).await?;

        let artifact_path = request.dest_dir.join(format!("{}.mp3", request.job_id));
        tokio::fs::write(&artifact_path, b"<html>not audio at all</html>").await?;

        Ok(FetchedMedia {
            artifact_path,
            title: Some("Corrupt".to_string()),
            thumbnail_ref: None,
            duration_seconds: None,
        })
    }
}

/// Object store whose puts always fail, for exercising the retry exhaustion
/// path end to end.
pub struct BrokenObjectStore;

#[async_trait]
impl ObjectStore for BrokenObjectStore {
    async fn put(&self, _key: &str, _data: Bytes, _ct: &str) -> StorageResult<String> {
        Err(StorageError::UploadFailed("store is down".to_string()))
    }

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn public_url(&self, key: &str) -> String {
        format!("http://broken.test/{}", key)
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ObjectStream> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn check(&self) -> StorageResult<()> {
        Err(StorageError::BackendError("store is down".to_string()))
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Poll until the job reaches a terminal state. Panics after ~2s.
pub async fn wait_terminal(store: &InMemoryMetadataStore, id: Uuid) -> Job {
    for _ in 0..200 {
        if let Some(job) = store.get(id).await.unwrap() {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach a terminal state", id);
}
