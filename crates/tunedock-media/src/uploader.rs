//! Object upload manager - bounded retries and size-scaled timeouts

use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tunedock_storage::{ObjectStore, StorageError, AUDIO_CONTENT_TYPE};

const UPLOAD_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

const TIMEOUT_SECS_PER_MIB: u64 = 10;
const MIN_TIMEOUT_SECS: u64 = 60;
const MAX_TIMEOUT_SECS: u64 = 300;

/// Per-attempt upload deadline scaled by artifact size: 10s per MiB (rounded
/// up), clamped to [60s, 300s].
pub fn compute_timeout(size_bytes: u64) -> Duration {
    const MIB: u64 = 1024 * 1024;
    let mib = size_bytes.div_ceil(MIB);
    let secs = (mib * TIMEOUT_SECS_PER_MIB).clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to read artifact {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload failed after {attempts} attempts: {source}")]
    Retry {
        attempts: u32,
        #[source]
        source: StorageError,
    },
}

/// A successfully stored artifact.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub storage_key: String,
    pub artifact_ref: String,
}

/// Pushes verified artifacts to durable storage.
///
/// Failure leaves the local artifact in place so the caller decides what to
/// clean up; success hands back the stable public reference to persist.
pub struct UploadManager {
    store: Arc<dyn ObjectStore>,
    attempts: u32,
    backoff: Duration,
}

impl UploadManager {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_policy(store, UPLOAD_ATTEMPTS, RETRY_BACKOFF)
    }

    /// Override the retry policy. Tests use this to drop the backoff.
    pub fn with_policy(store: Arc<dyn ObjectStore>, attempts: u32, backoff: Duration) -> Self {
        Self {
            store,
            attempts,
            backoff,
        }
    }

    #[tracing::instrument(skip(self, artifact_path), fields(key = %key))]
    pub async fn upload(
        &self,
        artifact_path: &Path,
        key: &str,
    ) -> Result<StoredObject, UploadError> {
        let data = tokio::fs::read(artifact_path)
            .await
            .map_err(|source| UploadError::Read {
                path: artifact_path.display().to_string(),
                source,
            })?;
        let data = Bytes::from(data);
        let attempt_timeout = compute_timeout(data.len() as u64);

        let mut last_error = StorageError::UploadFailed("no attempt was made".to_string());

        for attempt in 1..=self.attempts {
            let put = self.store.put(key, data.clone(), AUDIO_CONTENT_TYPE);
            match tokio::time::timeout(attempt_timeout, put).await {
                Ok(Ok(artifact_ref)) => {
                    tracing::info!(
                        size_bytes = data.len(),
                        attempt,
                        "Artifact upload successful"
                    );
                    return Ok(StoredObject {
                        storage_key: key.to_string(),
                        artifact_ref,
                    });
                }
                Ok(Err(e)) => last_error = e,
                Err(_) => {
                    last_error = StorageError::UploadFailed(format!(
                        "attempt timed out after {}s",
                        attempt_timeout.as_secs()
                    ));
                }
            }

            tracing::warn!(
                attempt,
                max_attempts = self.attempts,
                error = %last_error,
                "Upload attempt failed"
            );

            if attempt < self.attempts {
                tokio::time::sleep(self.backoff).await;
            }
        }

        Err(UploadError::Retry {
            attempts: self.attempts,
            source: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;
    use tunedock_storage::{ObjectStream, StorageBackend, StorageResult};

    #[test]
    fn test_compute_timeout_clamps_small_files_to_floor() {
        assert_eq!(compute_timeout(0), Duration::from_secs(60));
        assert_eq!(compute_timeout(1), Duration::from_secs(60));
        assert_eq!(compute_timeout(6 * 1024 * 1024), Duration::from_secs(60));
    }

    #[test]
    fn test_compute_timeout_scales_per_mib_rounded_up() {
        assert_eq!(
            compute_timeout(7 * 1024 * 1024),
            Duration::from_secs(70)
        );
        assert_eq!(
            compute_timeout(6 * 1024 * 1024 + 1),
            Duration::from_secs(70)
        );
        assert_eq!(
            compute_timeout(15 * 1024 * 1024),
            Duration::from_secs(150)
        );
    }

    #[test]
    fn test_compute_timeout_clamps_large_files_to_ceiling() {
        assert_eq!(
            compute_timeout(30 * 1024 * 1024),
            Duration::from_secs(300)
        );
        assert_eq!(
            compute_timeout(500 * 1024 * 1024),
            Duration::from_secs(300)
        );
    }

    /// ObjectStore double that refuses puts until a given attempt number.
    struct FlakyStore {
        succeed_on: u32,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(succeed_on: u32) -> Self {
            Self {
                succeed_on,
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn put(&self, key: &str, _data: Bytes, _ct: &str) -> StorageResult<String> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < self.succeed_on {
                Err(StorageError::UploadFailed(format!(
                    "attempt {} refused",
                    attempt
                )))
            } else {
                Ok(format!("http://store.test/{}", key))
            }
        }

        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(true)
        }

        fn public_url(&self, key: &str) -> String {
            format!("http://store.test/{}", key)
        }

        async fn get_stream(&self, key: &str) -> StorageResult<ObjectStream> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn check(&self) -> StorageResult<()> {
            Ok(())
        }

        fn backend(&self) -> StorageBackend {
            StorageBackend::Local
        }
    }

    async fn artifact_in(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("artifact.mp3");
        tokio::fs::write(&path, b"ID3 pretend audio").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_retries_until_success() {
        let dir = tempdir().unwrap();
        let path = artifact_in(dir.path()).await;

        let store = Arc::new(FlakyStore::new(3));
        let manager = UploadManager::with_policy(store.clone(), 3, Duration::ZERO);

        let stored = manager.upload(&path, "alice/a.mp3").await.unwrap();
        assert_eq!(stored.storage_key, "alice/a.mp3");
        assert_eq!(stored.artifact_ref, "http://store.test/alice/a.mp3");
        assert_eq!(store.call_count(), 3);
    }

    #[tokio::test]
    async fn test_upload_gives_up_after_bounded_attempts() {
        let dir = tempdir().unwrap();
        let path = artifact_in(dir.path()).await;

        let store = Arc::new(FlakyStore::new(u32::MAX));
        let manager = UploadManager::with_policy(store.clone(), 3, Duration::ZERO);

        let err = manager.upload(&path, "alice/a.mp3").await.unwrap_err();
        assert!(matches!(err, UploadError::Retry { attempts: 3, .. }));
        assert_eq!(store.call_count(), 3);

        // The local artifact is left in place for the caller to handle.
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_upload_missing_artifact_is_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.mp3");

        let store = Arc::new(FlakyStore::new(1));
        let manager = UploadManager::with_policy(store, 3, Duration::ZERO);

        let err = manager.upload(&path, "alice/a.mp3").await.unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }
}
