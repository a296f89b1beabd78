use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus};
use crate::models::tour::Tour;
use crate::store::{unique_violation, PgStore};
use crate::utils::error::AppError;
use crate::workflow::{actor as actor_rules, booking as booking_rules, Actor};

pub(super) async fn load_booking(conn: &mut PgConnection, id: Uuid) -> Result<Booking, AppError> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub(super) async fn set_booking_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: BookingStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(super) async fn booking_has_approved_payment(
    conn: &mut PgConnection,
    booking_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS(
             SELECT 1 FROM payments
             WHERE payable_kind = 'tour_bookings' AND payable_id = $1 AND status = 'approved')"#,
    )
    .bind(booking_id)
    .fetch_one(&mut *conn)
    .await
}

impl PgStore {
    // -- Booking Operations --

    pub async fn get_booking(&self, id: Uuid) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list_all_bookings(&self, tour_id: Option<Uuid>) -> Result<Vec<Booking>, AppError> {
        let rows = match tour_id {
            Some(tour_id) => {
                sqlx::query_as::<_, Booking>(
                    "SELECT * FROM bookings WHERE tour_id = $1 ORDER BY created_at DESC",
                )
                .bind(tour_id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY created_at DESC")
                    .fetch_all(self.pool())
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn list_bookings_for_tourist(
        &self,
        tourist_id: Uuid,
    ) -> Result<Vec<Booking>, AppError> {
        let rows = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE tourist_id = $1 ORDER BY created_at DESC",
        )
        .bind(tourist_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn list_bookings_for_guide(
        &self,
        guide_id: Uuid,
        tour_id: Option<Uuid>,
    ) -> Result<Vec<Booking>, AppError> {
        let rows = match tour_id {
            Some(tour_id) => {
                sqlx::query_as::<_, Booking>(
                    r#"SELECT b.* FROM bookings b
                       JOIN tours t ON t.id = b.tour_id
                       WHERE t.guide_id = $1 AND b.tour_id = $2
                       ORDER BY b.created_at DESC"#,
                )
                .bind(guide_id)
                .bind(tour_id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, Booking>(
                    r#"SELECT b.* FROM bookings b
                       JOIN tours t ON t.id = b.tour_id
                       WHERE t.guide_id = $1
                       ORDER BY b.created_at DESC"#,
                )
                .bind(guide_id)
                .fetch_all(self.pool())
                .await?
            }
        };
        Ok(rows)
    }

    /// Validates and inserts a booking; the amount is derived from the tour
    /// price. The partial unique index catches duplicate races the EXISTS
    /// check missed and is mapped to the same validation error.
    pub async fn create_booking(
        &self,
        actor: &Actor,
        tour_id: Uuid,
        participants_count: i32,
        today: NaiveDate,
    ) -> Result<Booking, AppError> {
        let tour = self.get_tour(tour_id).await?;

        let has_active_booking = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                 SELECT 1 FROM bookings
                 WHERE tour_id = $1 AND tourist_id = $2 AND status <> 'rejected')"#,
        )
        .bind(tour_id)
        .bind(actor.id)
        .fetch_one(self.pool())
        .await?;

        booking_rules::ensure_can_create(
            actor,
            &tour,
            participants_count,
            has_active_booking,
            today,
        )?;
        let amount = booking_rules::booking_amount(tour.price, participants_count);

        let booking = sqlx::query_as::<_, Booking>(
            r#"INSERT INTO bookings (tour_id, tourist_id, participants_count, amount)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(tour_id)
        .bind(actor.id)
        .bind(participants_count)
        .bind(amount)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            if unique_violation(&e, "uniq_bookings_active") {
                AppError::invalid_field(
                    "tour_id",
                    "you already have an active booking for this tour",
                )
            } else {
                AppError::from(e)
            }
        })?;

        Ok(booking)
    }

    /// Changes the headcount on a pending booking and re-derives the amount.
    pub async fn update_booking_participants(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        participants_count: i32,
    ) -> Result<Booking, AppError> {
        let mut tx = self.pool().begin().await?;

        let booking = load_booking(&mut tx, booking_id).await?;
        actor_rules::ensure_can_modify_booking(actor, &booking)?;
        booking_rules::ensure_can_update_participants(&booking, participants_count)?;

        let tour = sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = $1")
            .bind(booking.tour_id)
            .fetch_one(&mut *tx)
            .await?;
        let amount = booking_rules::booking_amount(tour.price, participants_count);

        // The status guard catches a concurrent approve/reject between the
        // read above and this write.
        let updated = sqlx::query_as::<_, Booking>(
            r#"UPDATE bookings
               SET participants_count = $2, amount = $3, updated_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING *"#,
        )
        .bind(booking_id)
        .bind(participants_count)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("only pending bookings can be modified".into()))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Guide/admin confirmation of a booking that already has an approved
    /// payment.
    pub async fn approve_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<Booking, AppError> {
        let mut tx = self.pool().begin().await?;

        let booking = load_booking(&mut tx, booking_id).await?;
        let tour = sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = $1")
            .bind(booking.tour_id)
            .fetch_one(&mut *tx)
            .await?;
        actor_rules::ensure_can_review_booking(actor, &tour)?;

        let has_approved_payment = booking_has_approved_payment(&mut tx, booking_id).await?;
        booking_rules::ensure_can_approve(&booking, has_approved_payment)?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"UPDATE bookings
               SET status = 'approved', updated_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING *"#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("booking is no longer pending".into()))?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn reject_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<Booking, AppError> {
        let mut tx = self.pool().begin().await?;

        let booking = load_booking(&mut tx, booking_id).await?;
        let tour = sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = $1")
            .bind(booking.tour_id)
            .fetch_one(&mut *tx)
            .await?;
        actor_rules::ensure_can_review_booking(actor, &tour)?;
        booking_rules::ensure_can_reject(&booking)?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"UPDATE bookings
               SET status = 'rejected', updated_at = NOW()
               WHERE id = $1 AND status <> 'rejected'
               RETURNING *"#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("booking is already rejected".into()))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Removes a booking and every payment attached to it. Returns the
    /// receipt paths of the deleted payments so the caller can clean up the
    /// stored blobs after the transaction commits.
    pub async fn cancel_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<Vec<String>, AppError> {
        let mut tx = self.pool().begin().await?;

        let booking = load_booking(&mut tx, booking_id).await?;
        actor_rules::ensure_can_cancel_booking(actor, &booking)?;

        let has_approved_payment = booking_has_approved_payment(&mut tx, booking_id).await?;
        booking_rules::ensure_can_cancel(&booking, has_approved_payment)?;

        let receipts = sqlx::query_scalar::<_, Option<String>>(
            r#"DELETE FROM payments
               WHERE payable_kind = 'tour_bookings' AND payable_id = $1
               RETURNING receipt_image"#,
        )
        .bind(booking_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(receipts.into_iter().flatten().collect())
    }
}
