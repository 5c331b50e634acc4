pub mod config;
pub mod error;
pub mod models;
pub mod sanitize;
pub mod storage_types;
pub mod store;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use store::{IdentityStore, MetadataStore, StoreError, StoreResult};
