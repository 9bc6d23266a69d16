/// Case repository - database operations for cases
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::CaseRepository;
use crate::error::Result;
use crate::models::Case;

pub struct PgCaseRepository {
    pool: PgPool,
}

impl PgCaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaseRepository for PgCaseRepository {
    async fn find_any(&self, id: Uuid) -> Result<Option<Case>> {
        let case = sqlx::query_as::<_, Case>(
            "SELECT id, reference, state, closed_at, created_at, deleted_at
             FROM cases
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(case)
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<Case>> {
        let case = sqlx::query_as::<_, Case>(
            "SELECT id, reference, state, closed_at, created_at, deleted_at
             FROM cases
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(case)
    }

    async fn save(&self, case: &Case) -> Result<()> {
        sqlx::query(
            "INSERT INTO cases (id, reference, state, closed_at, created_at, deleted_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE
             SET reference = EXCLUDED.reference,
                 state = EXCLUDED.state,
                 closed_at = EXCLUDED.closed_at,
                 deleted_at = EXCLUDED.deleted_at",
        )
        .bind(case.id)
        .bind(&case.reference)
        .bind(&case.state)
        .bind(case.closed_at)
        .bind(case.created_at)
        .bind(case.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE cases SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn undelete(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE cases SET deleted_at = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
