//! Shared key generation for storage backends.
//!
//! Key format: `{owner}/{job_id}.mp3` for the library root, or
//! `{owner}/{folder}/{job_id}.mp3` when the job was filed into a folder.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Content type every stored artifact is served with.
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// File name of a finished artifact. The job id doubles as the file stem so
/// names never collide even when two sources share a title.
pub fn artifact_filename(job_id: Uuid) -> String {
    format!("{}.mp3", job_id)
}

/// Generate the storage key for a job's artifact.
///
/// For jobs without a folder this produces `{owner}/{job_id}.mp3`; otherwise
/// `{owner}/{folder}/{job_id}.mp3`. All backends must use this format for
/// consistency. `owner` and `folder` are expected to already be sanitized.
pub fn object_key(owner: &str, folder: Option<&str>, job_id: Uuid) -> String {
    match folder {
        Some(folder) => format!("{}/{}/{}", owner, folder, artifact_filename(job_id)),
        None => format!("{}/{}", owner, artifact_filename(job_id)),
    }
}

/// Local working directory a job downloads and converts inside.
///
/// Mirrors the storage key layout so deleting a folder can also sweep any
/// scratch space left behind for it.
pub fn scratch_dir(scratch_root: &Path, owner: &str, folder: Option<&str>) -> PathBuf {
    match folder {
        Some(folder) => scratch_root.join(owner).join(folder),
        None => scratch_root.join(owner),
    }
}
