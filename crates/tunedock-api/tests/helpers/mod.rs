//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p tunedock-api`. The metadata and
//! owner stores are in-memory doubles honoring the same guards as the
//! Postgres repositories, and storage is a tempdir-backed local store, so the
//! suite needs no external services.

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tunedock_api::setup::routes;
use tunedock_api::state::AppState;
use tunedock_core::models::{Job, JobStatus, NewJob};
use tunedock_core::sanitize::truncate_message;
use tunedock_core::{IdentityStore, MetadataStore, StoreResult};
use tunedock_media::{FetchError, FetchRequest, FetchedMedia, MediaFetcher, UploadManager};
use tunedock_storage::{LocalStorage, ObjectStore};
use tunedock_worker::Orchestrator;
use uuid::Uuid;

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token";

/// Test application: server plus handles on the backing stores.
pub struct TestApp {
    pub server: TestServer,
    pub metadata: Arc<InMemoryMetadataStore>,
    pub identity: Arc<InMemoryIdentityStore>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Setup test app with in-memory stores and tempdir-backed local storage.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_fetcher(Arc::new(StubFetcher::new())).await
}

pub async fn setup_test_app_with_fetcher(fetcher: Arc<dyn MediaFetcher>) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let metadata = Arc::new(InMemoryMetadataStore::new());
    let identity = Arc::new(InMemoryIdentityStore::new());

    let objects: Arc<dyn ObjectStore> = Arc::new(
        LocalStorage::new(
            temp_dir.path().join("library"),
            "http://localhost:8080/media".to_string(),
        )
        .await
        .expect("Failed to create local storage"),
    );

    let uploader = Arc::new(UploadManager::with_policy(objects.clone(), 3, Duration::ZERO));
    let scratch_root = temp_dir.path().join("scratch");

    let orchestrator = Orchestrator::new(
        metadata.clone(),
        identity.clone(),
        fetcher,
        uploader,
        2,
        scratch_root.clone(),
    );

    let state = Arc::new(AppState {
        metadata: metadata.clone(),
        identity: identity.clone(),
        objects,
        orchestrator,
        scratch_root,
        admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
        cors_origins: vec!["*".to_string()],
    });

    let app = routes::setup_routes(state).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        metadata,
        identity,
        _temp_dir: temp_dir,
    }
}

/// Poll /status/{id} until the job reaches a terminal state. Panics after ~2s.
pub async fn wait_terminal(server: &TestServer, id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = server.get(&format!("/status/{}", id)).await;
        if response.status_code() == 200 {
            let body: serde_json::Value = response.json();
            if matches!(body["status"].as_str(), Some("completed") | Some("error")) {
                return body;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach a terminal state", id);
}

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

/// Fetcher that "downloads" by writing a valid MP3 artifact.
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

/// Fetcher that always fails with a fixed classified error.
pub struct FailingFetcher;

#[async_trait]
impl MediaFetcher for FailingFetcher {
    async fn fetch_and_transcode(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchedMedia, FetchError> {
        tokio::fs::create_dir_all(&request.dest_dir).await?;

        Err(FetchError::Unavailable("Video unavailable".to_string()))
    }
}
