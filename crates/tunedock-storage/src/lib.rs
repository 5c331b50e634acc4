//! Tunedock Storage Library
//!
//! This crate provides storage abstraction and implementations for Tunedock.
//! It includes the ObjectStore trait and implementations for S3 and the local
//! filesystem.
//!
//! # Storage key format
//!
//! Storage keys are owner-scoped. All backends use the same key layout for
//! consistency:
//!
//! - **No folder**: `{owner}/{job_id}.mp3`
//! - **With folder**: `{owner}/{folder}/{job_id}.mp3`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent, and completed jobs
//! record the exact key they were stored under rather than re-deriving it.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_object_store;
pub use keys::{artifact_filename, object_key, scratch_dir, AUDIO_CONTENT_TYPE};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectStore, ObjectStream, StorageError, StorageResult};
pub use tunedock_core::StorageBackend;
