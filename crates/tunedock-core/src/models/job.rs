use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a conversion job.
///
/// `Completed` and `Error` are terminal; every non-terminal state may fail
/// into `Error`. Forward moves are strictly sequential, there is no skipping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "job_status", rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Downloading,
    Converting,
    Uploading,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            JobStatus::Queued => matches!(next, JobStatus::Downloading | JobStatus::Error),
            JobStatus::Downloading => matches!(next, JobStatus::Converting | JobStatus::Error),
            JobStatus::Converting => matches!(next, JobStatus::Uploading | JobStatus::Error),
            JobStatus::Uploading => matches!(next, JobStatus::Completed | JobStatus::Error),
            JobStatus::Completed | JobStatus::Error => false,
        }
    }

    /// Progress milestone written when entering this state.
    ///
    /// `Error` carries no milestone of its own: a failing job keeps the
    /// progress it had reached, so progress never regresses.
    pub fn milestone(&self) -> Option<i16> {
        match self {
            JobStatus::Queued => Some(0),
            JobStatus::Downloading => Some(10),
            JobStatus::Converting => Some(50),
            JobStatus::Uploading => Some(70),
            JobStatus::Completed => Some(100),
            JobStatus::Error => None,
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Downloading => write!(f, "downloading"),
            JobStatus::Converting => write!(f, "converting"),
            JobStatus::Uploading => write!(f, "uploading"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "downloading" => Ok(JobStatus::Downloading),
            "converting" => Ok(JobStatus::Converting),
            "uploading" => Ok(JobStatus::Uploading),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Output bitrate tier. Two values only; anything unrecognized coerces to
/// `Low` rather than erroring, so callers cannot request arbitrary rates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "bitrate_tier", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum BitrateTier {
    #[default]
    Low,
    High,
}

impl BitrateTier {
    /// Map raw caller input to a tier. Unknown or absent input is `Low`.
    pub fn from_input(input: Option<&str>) -> Self {
        match input.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => BitrateTier::High,
            _ => BitrateTier::Low,
        }
    }

    /// Constant bitrate in kbps fed to the transcoder.
    pub fn kbps(&self) -> u32 {
        match self {
            BitrateTier::Low => 64,
            BitrateTier::High => 128,
        }
    }
}

impl Display for BitrateTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BitrateTier::Low => write!(f, "low"),
            BitrateTier::High => write!(f, "high"),
        }
    }
}

/// One conversion request's full lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub requester_id: String,
    pub source_url: String,
    pub folder: Option<String>,
    pub bitrate_tier: BitrateTier,
    pub status: JobStatus,
    pub progress: i16,
    pub title: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub duration_seconds: Option<i32>,
    pub file_size_bytes: Option<i64>,
    /// Object-store key. Internal; carried so deletion never has to
    /// re-derive the key from the public reference.
    pub storage_key: Option<String>,
    pub artifact_ref: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Job {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Job {
            id: row.get("id"),
            requester_id: row.get("requester_id"),
            source_url: row.get("source_url"),
            folder: row.get("folder"),
            bitrate_tier: row.get("bitrate_tier"),
            status: row.get("status"),
            progress: row.get("progress"),
            title: row.get("title"),
            thumbnail_ref: row.get("thumbnail_ref"),
            duration_seconds: row.get("duration_seconds"),
            file_size_bytes: row.get("file_size_bytes"),
            storage_key: row.get("storage_key"),
            artifact_ref: row.get("artifact_ref"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            finished_at: row.get("finished_at"),
        })
    }
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Fields the creation path supplies; everything else starts at its
/// queued-state default.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: Uuid,
    pub requester_id: String,
    pub source_url: String,
    pub folder: Option<String>,
    pub bitrate_tier: BitrateTier,
}

impl NewJob {
    pub fn new(
        requester_id: String,
        source_url: String,
        folder: Option<String>,
        bitrate_tier: BitrateTier,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_id,
            source_url,
            folder,
            bitrate_tier,
        }
    }
}

/// Job snapshot served by the API. The internal storage key stays private.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: Uuid,
    pub requester_id: String,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub bitrate_tier: BitrateTier,
    pub status: JobStatus,
    pub progress: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            requester_id: job.requester_id,
            source_url: job.source_url,
            folder: job.folder,
            bitrate_tier: job.bitrate_tier,
            status: job.status,
            progress: job.progress,
            title: job.title,
            thumbnail_ref: job.thumbnail_ref,
            duration_seconds: job.duration_seconds,
            file_size_bytes: job.file_size_bytes,
            artifact_ref: job.artifact_ref,
            error_message: job.error_message,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}
