use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use tunedock_core::models::{Job, JobStatus, NewJob};
use tunedock_core::sanitize::truncate_message;
use tunedock_core::{MetadataStore, StoreResult};
use uuid::Uuid;

/// Job rows, with every lifecycle mutation guarded in SQL so a stale writer
/// loses the race instead of overwriting a terminal row.
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for JobRepository {
    #[tracing::instrument(skip(self, new_job), fields(db.table = "jobs", db.operation = "insert", job_id = %new_job.id))]
    async fn insert(&self, new_job: &NewJob) -> StoreResult<Job> {
        let job = sqlx::query_as::<Postgres, Job>(
            r#"
            INSERT INTO jobs (id, requester_id, source_url, folder, bitrate_tier)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
                id, requester_id, source_url, folder, bitrate_tier, status,
                progress, title, thumbnail_ref, duration_seconds,
                file_size_bytes, storage_key, artifact_ref, error_message,
                created_at, started_at, finished_at
            "#,
        )
        .bind(new_job.id)
        .bind(&new_job.requester_id)
        .bind(&new_job.source_url)
        .bind(new_job.folder.as_deref())
        .bind(new_job.bitrate_tier)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "select", job_id = %id))]
    async fn get(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let job = sqlx::query_as::<Postgres, Job>(
            r#"
            SELECT
                id, requester_id, source_url, folder, bitrate_tier, status,
                progress, title, thumbnail_ref, duration_seconds,
                file_size_bytes, storage_key, artifact_ref, error_message,
                created_at, started_at, finished_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "select"))]
    async fn list_all(&self) -> StoreResult<Vec<Job>> {
        let jobs = sqlx::query_as::<Postgres, Job>(
            r#"
            SELECT
                id, requester_id, source_url, folder, bitrate_tier, status,
                progress, title, thumbnail_ref, duration_seconds,
                file_size_bytes, storage_key, artifact_ref, error_message,
                created_at, started_at, finished_at
            FROM jobs
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "select"))]
    async fn list_for_requester(&self, requester_id: &str) -> StoreResult<Vec<Job>> {
        let jobs = sqlx::query_as::<Postgres, Job>(
            r#"
            SELECT
                id, requester_id, source_url, folder, bitrate_tier, status,
                progress, title, thumbnail_ref, duration_seconds,
                file_size_bytes, storage_key, artifact_ref, error_message,
                created_at, started_at, finished_at
            FROM jobs
            WHERE requester_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "select"))]
    async fn list_completed(&self) -> StoreResult<Vec<Job>> {
        let jobs = sqlx::query_as::<Postgres, Job>(
            r#"
            SELECT
                id, requester_id, source_url, folder, bitrate_tier, status,
                progress, title, thumbnail_ref, duration_seconds,
                file_size_bytes, storage_key, artifact_ref, error_message,
                created_at, started_at, finished_at
            FROM jobs
            WHERE status = 'completed'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "select"))]
    async fn list_in_folder(&self, folder: &str) -> StoreResult<Vec<Job>> {
        let jobs = sqlx::query_as::<Postgres, Job>(
            r#"
            SELECT
                id, requester_id, source_url, folder, bitrate_tier, status,
                progress, title, thumbnail_ref, duration_seconds,
                file_size_bytes, storage_key, artifact_ref, error_message,
                created_at, started_at, finished_at
            FROM jobs
            WHERE folder = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(folder)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    #[tracing::instrument(skip(self, source_url), fields(db.table = "jobs", db.operation = "select"))]
    async fn find_conflict(&self, source_url: &str) -> StoreResult<Option<Job>> {
        let job = sqlx::query_as::<Postgres, Job>(
            r#"
            SELECT
                id, requester_id, source_url, folder, bitrate_tier, status,
                progress, title, thumbnail_ref, duration_seconds,
                file_size_bytes, storage_key, artifact_ref, error_message,
                created_at, started_at, finished_at
            FROM jobs
            WHERE source_url = $1 AND status <> 'error'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "update", job_id = %id))]
    async fn advance(&self, id: Uuid, from: JobStatus, to: JobStatus) -> StoreResult<bool> {
        if !from.can_transition_to(to) {
            return Ok(false);
        }
        let milestone = to.milestone().unwrap_or(0);

        // Entering Downloading stamps started_at exactly once.
        let result = if to == JobStatus::Downloading {
            sqlx::query(
                r#"
                UPDATE jobs
                SET status = $3,
                    progress = GREATEST(progress, $4),
                    started_at = COALESCE(started_at, now())
                WHERE id = $1 AND status = $2
                "#,
            )
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(milestone)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE jobs
                SET status = $3,
                    progress = GREATEST(progress, $4)
                WHERE id = $1 AND status = $2
                "#,
            )
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(milestone)
            .execute(&self.pool)
            .await?
        };

        let moved = result.rows_affected() > 0;
        if moved {
            tracing::debug!(from = %from, to = %to, "Job advanced");
        }
        Ok(moved)
    }

    #[tracing::instrument(skip(self, title, thumbnail_ref), fields(db.table = "jobs", db.operation = "update", job_id = %id))]
    async fn set_media_details(
        &self,
        id: Uuid,
        title: Option<&str>,
        thumbnail_ref: Option<&str>,
        duration_seconds: Option<i32>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE jobs SET title = $2, thumbnail_ref = $3, duration_seconds = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .bind(thumbnail_ref)
        .bind(duration_seconds)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, storage_key, artifact_ref), fields(db.table = "jobs", db.operation = "update", job_id = %id))]
    async fn complete(
        &self,
        id: Uuid,
        storage_key: &str,
        artifact_ref: &str,
        file_size_bytes: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed',
                progress = GREATEST(progress, 100),
                storage_key = $2,
                artifact_ref = $3,
                file_size_bytes = $4,
                finished_at = COALESCE(finished_at, now())
            WHERE id = $1 AND status = 'uploading'
            "#,
        )
        .bind(id)
        .bind(storage_key)
        .bind(artifact_ref)
        .bind(file_size_bytes)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, message), fields(db.table = "jobs", db.operation = "update", job_id = %id))]
    async fn fail(&self, id: Uuid, message: &str) -> StoreResult<bool> {
        let message = truncate_message(message);

        // Error is reachable from every non-terminal state; progress stays
        // where it was.
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'error',
                error_message = $2,
                finished_at = COALESCE(finished_at, now())
            WHERE id = $1 AND status NOT IN ('completed', 'error')
            "#,
        )
        .bind(id)
        .bind(&message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "delete", job_id = %id))]
    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<Postgres, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(())
    }
}
