use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use tunedock_core::{IdentityStore, StoreError, StoreResult};

/// The singleton owner row. Installation is first-caller-wins: an insert that
/// hits the existing row changes nothing, and the read-back reports whichever
/// identity won.
#[derive(Clone)]
pub struct OwnerRepository {
    pool: PgPool,
}

impl OwnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for OwnerRepository {
    #[tracing::instrument(skip(self), fields(db.table = "owner_identity", db.operation = "select"))]
    async fn current(&self) -> StoreResult<Option<String>> {
        let identity = sqlx::query_scalar::<Postgres, String>(
            "SELECT identity FROM owner_identity WHERE id = TRUE",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    #[tracing::instrument(skip(self), fields(db.table = "owner_identity", db.operation = "insert"))]
    async fn install_if_absent(&self, candidate: &str) -> StoreResult<String> {
        sqlx::query(
            r#"
            INSERT INTO owner_identity (id, identity)
            VALUES (TRUE, $1)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(candidate)
        .execute(&self.pool)
        .await?;

        let winner = sqlx::query_scalar::<Postgres, String>(
            "SELECT identity FROM owner_identity WHERE id = TRUE",
        )
        .fetch_optional(&self.pool)
        .await?;

        winner.ok_or_else(|| StoreError::Database("owner identity missing after install".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "owner_identity", db.operation = "update"))]
    async fn reassign(&self, identity: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO owner_identity (id, identity)
            VALUES (TRUE, $1)
            ON CONFLICT (id) DO UPDATE SET identity = EXCLUDED.identity, claimed_at = now()
            "#,
        )
        .bind(identity)
        .execute(&self.pool)
        .await?;

        tracing::info!(identity = %identity, "Owner identity reassigned");
        Ok(())
    }
}
