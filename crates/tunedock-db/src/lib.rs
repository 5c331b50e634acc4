//! Postgres persistence for Tunedock.
//!
//! Repositories implement the store traits from `tunedock-core`; the rest of
//! the system never sees `sqlx` directly. Schema lives in the workspace
//! `migrations/` directory and is applied on startup.

pub mod db;

pub use db::{JobRepository, OwnerRepository};
