/// Booking repository - database operations for bookings
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::BookingRepository;
use crate::error::Result;
use crate::models::Booking;

const BOOKING_COLUMNS: &str =
    "id, case_id, scheduled_for, created_at, deleted_at, deleted_via_cascade";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn find_any(&self, id: Uuid) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    async fn find_all_live_by_case(&self, case_id: Uuid) -> Result<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE case_id = $1 AND deleted_at IS NULL"
        ))
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn find_scheduled_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE scheduled_for >= $1 AND scheduled_for < $2 AND deleted_at IS NULL
             ORDER BY scheduled_for ASC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn save(&self, booking: &Booking) -> Result<()> {
        sqlx::query(
            "INSERT INTO bookings (id, case_id, scheduled_for, created_at, deleted_at, deleted_via_cascade)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE
             SET case_id = EXCLUDED.case_id,
                 scheduled_for = EXCLUDED.scheduled_for,
                 deleted_at = EXCLUDED.deleted_at,
                 deleted_via_cascade = EXCLUDED.deleted_via_cascade",
        )
        .bind(booking.id)
        .bind(booking.case_id)
        .bind(booking.scheduled_for)
        .bind(booking.created_at)
        .bind(booking.deleted_at)
        .bind(booking.deleted_via_cascade)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>, via_cascade: bool) -> Result<()> {
        sqlx::query(
            "UPDATE bookings SET deleted_at = $2, deleted_via_cascade = $3
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .bind(via_cascade)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn undelete(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE bookings SET deleted_at = NULL, deleted_via_cascade = FALSE WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
