//! Tunedock Media Library
//!
//! Pipeline stages between "job accepted" and "artifact stored": fetching a
//! source and transcoding it to MP3 (yt-dlp), verifying the produced
//! artifact, and uploading it to durable storage with a bounded retry policy.

pub mod fetcher;
pub mod uploader;
pub mod verifier;

pub use fetcher::{FetchError, FetchRequest, FetchedMedia, MediaFetcher, YtDlpFetcher};
pub use uploader::{compute_timeout, StoredObject, UploadError, UploadManager};
pub use verifier::verify_mp3;
