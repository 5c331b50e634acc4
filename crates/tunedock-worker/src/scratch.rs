//! Scratch directory management for in-flight conversions.
//!
//! Layout mirrors the storage key layout: `{scratch_root}/{owner}/{folder}`.
//! Everything here is best-effort; a cleanup failure is logged and counted,
//! never propagated into the pipeline.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Create the scratch directory for an owner/folder pair and return its path.
pub async fn ensure_scratch_dir(
    scratch_root: &Path,
    owner: &str,
    folder: Option<&str>,
) -> std::io::Result<PathBuf> {
    let dir = tunedock_storage::scratch_dir(scratch_root, owner, folder);
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// Remove `{job_id}.*` byproducts that are not the `.mp3` artifact.
///
/// yt-dlp leaves the pre-transcode container (`.webm`, `.m4a`, partial
/// downloads) next to the extracted audio. Files belonging to other jobs are
/// untouched. Returns how many files were removed.
pub async fn cleanup_sibling_artifacts(dir: &Path, job_id: Uuid) -> u32 {
    let prefix = format!("{}.", job_id);
    let keep = format!("{}.mp3", job_id);
    let mut removed = 0u32;

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "No scratch directory to sweep");
            return 0;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to read scratch entry");
                break;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&prefix) || name == keep {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "Failed to remove sibling artifact"
                );
            }
        }
    }

    if removed > 0 {
        tracing::debug!(
            dir = %dir.display(),
            job_id = %job_id,
            removed,
            "Removed sibling download artifacts"
        );
    }

    removed
}

/// Remove a single scratch file. Missing files are fine.
pub async fn remove_scratch_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch artifact");
        }
    }
}

/// Remove a whole scratch directory tree. Missing directories are fine.
pub async fn remove_scratch_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn sweeps_only_this_jobs_non_mp3_files() {
        let dir = tempdir().unwrap();
        let job_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();

        for name in [
            format!("{}.webm", job_id),
            format!("{}.webm.part", job_id),
            format!("{}.mp3", job_id),
            format!("{}.webm", other_id),
        ] {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }

        let removed = cleanup_sibling_artifacts(dir.path(), job_id).await;
        assert_eq!(removed, 2);

        assert!(dir.path().join(format!("{}.mp3", job_id)).exists());
        assert!(dir.path().join(format!("{}.webm", other_id)).exists());
        assert!(!dir.path().join(format!("{}.webm", job_id)).exists());
    }

    #[tokio::test]
    async fn missing_directory_sweeps_nothing() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert_eq!(cleanup_sibling_artifacts(&missing, Uuid::new_v4()).await, 0);
    }

    #[tokio::test]
    async fn ensure_creates_nested_dirs() {
        let root = tempdir().unwrap();

        let dir = ensure_scratch_dir(root.path(), "alice", Some("jazz"))
            .await
            .unwrap();

        assert!(dir.is_dir());
        assert!(dir.ends_with("alice/jazz"));
    }

    #[tokio::test]
    async fn file_and_dir_removal_tolerate_missing_targets() {
        let dir = tempdir().unwrap();

        remove_scratch_file(&dir.path().join("gone.mp3")).await;
        remove_scratch_dir(&dir.path().join("gone")).await;

        let file = dir.path().join("real.mp3");
        tokio::fs::write(&file, b"x").await.unwrap();
        remove_scratch_file(&file).await;
        assert!(!file.exists());
    }
}
