/// Share booking repository - database operations for booking share grants
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::ShareBookingRepository;
use crate::error::Result;
use crate::models::ShareBooking;

pub struct PgShareBookingRepository {
    pool: PgPool,
}

impl PgShareBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareBookingRepository for PgShareBookingRepository {
    async fn save(&self, share: &ShareBooking) -> Result<()> {
        sqlx::query(
            "INSERT INTO share_bookings (
                id, booking_id, shared_by_user_id, shared_with_user_id,
                created_at, deleted_at, deleted_via_cascade
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET deleted_at = EXCLUDED.deleted_at,
                deleted_via_cascade = EXCLUDED.deleted_via_cascade",
        )
        .bind(share.id)
        .bind(share.booking_id)
        .bind(share.shared_by_user_id)
        .bind(share.shared_with_user_id)
        .bind(share.created_at)
        .bind(share.deleted_at)
        .bind(share.deleted_via_cascade)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_all_live_by_booking(&self, booking_id: Uuid) -> Result<Vec<ShareBooking>> {
        let shares = sqlx::query_as::<_, ShareBooking>(
            "SELECT id, booking_id, shared_by_user_id, shared_with_user_id,
                    created_at, deleted_at, deleted_via_cascade
             FROM share_bookings
             WHERE booking_id = $1 AND deleted_at IS NULL",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shares)
    }

    async fn mark_all_deleted_by_booking(
        &self,
        booking_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE share_bookings SET deleted_at = $2, deleted_via_cascade = TRUE
             WHERE booking_id = $1 AND deleted_at IS NULL",
        )
        .bind(booking_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
