//! Application configuration loaded from environment variables.
//!
//! `.env` files are honored in development via dotenvy. Every knob has a
//! default except `DATABASE_URL` and the S3 settings, which are required
//! when their backend is selected; `validate()` rejects incoherent
//! combinations before anything starts.

use anyhow::{Context, Result};
use std::env;

const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_STORAGE_BACKEND: &str = "local";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./library";
const DEFAULT_BASE_URL: &str = "http://localhost:8080/media";
const DEFAULT_SCRATCH_DIR: &str = "./scratch";
const DEFAULT_YTDLP_PATH: &str = "yt-dlp";
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 900;
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;
const DEFAULT_CORS_ALLOWED_ORIGINS: &str = "*";
const DEFAULT_ENVIRONMENT: &str = "development";

#[derive(Debug, Clone)]
pub struct Config {
    server_port: u16,
    database_url: String,
    db_max_connections: u32,
    db_timeout_seconds: u64,
    storage_backend: String,
    local_storage_path: String,
    base_url: String,
    s3_bucket: Option<String>,
    s3_region: Option<String>,
    s3_endpoint_url: Option<String>,
    scratch_dir: String,
    ytdlp_path: String,
    ffmpeg_path: Option<String>,
    fetch_timeout_seconds: u64,
    max_concurrent_jobs: usize,
    admin_token: Option<String>,
    cors_allowed_origins: String,
    environment: String,
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server_port: env_parsed("SERVER_PORT", DEFAULT_SERVER_PORT),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: env_parsed("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_parsed("DB_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECONDS),
            storage_backend: env_or("STORAGE_BACKEND", DEFAULT_STORAGE_BACKEND),
            local_storage_path: env_or("LOCAL_STORAGE_PATH", DEFAULT_LOCAL_STORAGE_PATH),
            base_url: env_or("BASE_URL", DEFAULT_BASE_URL),
            s3_bucket: env::var("S3_BUCKET").ok().filter(|v| !v.is_empty()),
            s3_region: env::var("S3_REGION").ok().filter(|v| !v.is_empty()),
            s3_endpoint_url: env::var("S3_ENDPOINT_URL").ok().filter(|v| !v.is_empty()),
            scratch_dir: env_or("SCRATCH_DIR", DEFAULT_SCRATCH_DIR),
            ytdlp_path: env_or("YTDLP_PATH", DEFAULT_YTDLP_PATH),
            ffmpeg_path: env::var("FFMPEG_PATH").ok().filter(|v| !v.is_empty()),
            fetch_timeout_seconds: env_parsed("FETCH_TIMEOUT_SECONDS", DEFAULT_FETCH_TIMEOUT_SECONDS),
            max_concurrent_jobs: env_parsed("MAX_CONCURRENT_JOBS", DEFAULT_MAX_CONCURRENT_JOBS),
            admin_token: env::var("ADMIN_TOKEN").ok().filter(|v| !v.is_empty()),
            cors_allowed_origins: env_or("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGINS),
            environment: env_or("ENVIRONMENT", DEFAULT_ENVIRONMENT),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject incoherent configuration before startup.
    pub fn validate(&self) -> Result<()> {
        match self.storage_backend.as_str() {
            "local" => {
                if self.local_storage_path.is_empty() {
                    anyhow::bail!("LOCAL_STORAGE_PATH must be set for the local storage backend");
                }
                if self.base_url.is_empty() {
                    anyhow::bail!("BASE_URL must be set for the local storage backend");
                }
            }
            "s3" => {
                if self.s3_bucket.is_none() {
                    anyhow::bail!("S3_BUCKET must be set for the s3 storage backend");
                }
                if self.s3_region.is_none() {
                    anyhow::bail!("S3_REGION must be set for the s3 storage backend");
                }
            }
            other => anyhow::bail!(
                "Unknown STORAGE_BACKEND '{}' (expected 'local' or 's3')",
                other
            ),
        }

        if self.scratch_dir.is_empty() {
            anyhow::bail!("SCRATCH_DIR must not be empty");
        }
        if self.max_concurrent_jobs == 0 {
            anyhow::bail!("MAX_CONCURRENT_JOBS must be at least 1");
        }
        if self.fetch_timeout_seconds == 0 {
            anyhow::bail!("FETCH_TIMEOUT_SECONDS must be at least 1");
        }

        Ok(())
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn storage_backend(&self) -> &str {
        &self.storage_backend
    }

    pub fn local_storage_path(&self) -> &str {
        &self.local_storage_path
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint_url(&self) -> Option<&str> {
        self.s3_endpoint_url.as_deref()
    }

    pub fn scratch_dir(&self) -> &str {
        &self.scratch_dir
    }

    pub fn ytdlp_path(&self) -> &str {
        &self.ytdlp_path
    }

    pub fn ffmpeg_path(&self) -> Option<&str> {
        self.ffmpeg_path.as_deref()
    }

    pub fn fetch_timeout_seconds(&self) -> u64 {
        self.fetch_timeout_seconds
    }

    pub fn max_concurrent_jobs(&self) -> usize {
        self.max_concurrent_jobs
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    /// Comma-separated allowlist; `*` means any origin.
    pub fn cors_allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: DEFAULT_SERVER_PORT,
            database_url: "postgres://localhost/tunedock".to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            db_timeout_seconds: DEFAULT_DB_TIMEOUT_SECONDS,
            storage_backend: "local".to_string(),
            local_storage_path: DEFAULT_LOCAL_STORAGE_PATH.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint_url: None,
            scratch_dir: DEFAULT_SCRATCH_DIR.to_string(),
            ytdlp_path: DEFAULT_YTDLP_PATH.to_string(),
            ffmpeg_path: None,
            fetch_timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECONDS,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            admin_token: None,
            cors_allowed_origins: DEFAULT_CORS_ALLOWED_ORIGINS.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_local_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_local_without_path() {
        let mut config = base_config();
        config.local_storage_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_s3_without_bucket() {
        let mut config = base_config();
        config.storage_backend = "s3".to_string();
        config.s3_region = Some("us-east-1".to_string());
        assert!(config.validate().is_err());

        config.s3_bucket = Some("tunedock-library".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_backend() {
        let mut config = base_config();
        config.storage_backend = "ftp".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = base_config();
        config.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cors_origins_split_and_trimmed() {
        let mut config = base_config();
        config.cors_allowed_origins =
            "https://app.example.com, https://other.example.com".to_string();
        assert_eq!(
            config.cors_allowed_origins(),
            vec![
                "https://app.example.com".to_string(),
                "https://other.example.com".to_string()
            ]
        );
    }

    #[test]
    fn test_is_production() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "production".to_string();
        assert!(config.is_production());
    }
}
