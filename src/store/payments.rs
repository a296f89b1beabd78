use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus};
use crate::models::payment::{Payable, PayableKind, PayableRef, Payment, PaymentStatus};
use crate::models::plan::Plan;
use crate::store::bookings::set_booking_status;
use crate::store::{unique_violation, PgStore};
use crate::utils::error::AppError;
use crate::workflow::{
    actor as actor_rules, booking as booking_rules, payment as payment_rules, Actor,
};

pub struct NewPayment {
    pub payable: PayableRef,
    pub amount: Decimal,
    pub receipt_image: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Outcome of an admin review action: the updated payment plus whether the
/// linked booking changed state as a consequence.
#[derive(Debug, Serialize)]
pub struct PaymentReview {
    pub payment: Payment,
    pub booking_updated: bool,
}

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub payment_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct BulkApproveSummary {
    pub approved: usize,
    pub failed: usize,
    pub errors: Vec<BulkFailure>,
}

/// Resolves a tagged payable reference to its row. Adding a payable kind
/// means adding a variant here and in `PayableKind`; nothing else dispatches
/// on the kind.
async fn load_payable(conn: &mut PgConnection, payable: PayableRef) -> Result<Payable, AppError> {
    match payable.kind {
        PayableKind::TourBooking => {
            let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
                .bind(payable.id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(AppError::NotFound)?;
            Ok(Payable::Booking(booking))
        }
        PayableKind::Plan => {
            let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
                .bind(payable.id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(AppError::NotFound)?;
            Ok(Payable::Plan(plan))
        }
    }
}

async fn load_payment(conn: &mut PgConnection, id: Uuid) -> Result<Payment, AppError> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound)
}

impl PgStore {
    // -- Payment Operations --

    pub async fn get_payment(&self, id: Uuid) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list_payments(
        &self,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<Payment>, AppError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, Payment>(
                    "SELECT * FROM payments WHERE status = $1 ORDER BY created_at ASC",
                )
                .bind(status)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, Payment>("SELECT * FROM payments ORDER BY created_at DESC")
                    .fetch_all(self.pool())
                    .await?
            }
        };
        Ok(rows)
    }

    /// Records a payment claim against a payable. For booking payables the
    /// amount must equal the booking total and the booking must still be
    /// open for payment.
    pub async fn create_payment(
        &self,
        actor: &Actor,
        new: NewPayment,
    ) -> Result<Payment, AppError> {
        payment_rules::validate_amount(new.amount)?;

        let mut tx = self.pool().begin().await?;

        let payable = load_payable(&mut tx, new.payable).await?;
        actor_rules::ensure_can_pay(actor, &payable)?;

        let has_own_pending = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                 SELECT 1 FROM payments
                 WHERE payable_kind = $1 AND payable_id = $2 AND payer_id = $3
                   AND status = 'pending')"#,
        )
        .bind(new.payable.kind)
        .bind(new.payable.id)
        .bind(actor.id)
        .fetch_one(&mut *tx)
        .await?;
        payment_rules::ensure_no_duplicate(has_own_pending)?;

        payment_rules::ensure_amount_matches(new.amount, payable.expected_amount())?;

        if let Payable::Booking(booking) = &payable {
            let has_pending_payment = sqlx::query_scalar::<_, bool>(
                r#"SELECT EXISTS(
                     SELECT 1 FROM payments
                     WHERE payable_kind = 'tour_bookings' AND payable_id = $1
                       AND status = 'pending')"#,
            )
            .bind(booking.id)
            .fetch_one(&mut *tx)
            .await?;
            booking_rules::ensure_can_receive_payment(booking, has_pending_payment)?;
        }

        let payment = sqlx::query_as::<_, Payment>(
            r#"INSERT INTO payments
                 (payer_id, amount, payable_kind, payable_id, receipt_image,
                  transaction_id, payment_method, notes)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(actor.id)
        .bind(new.amount)
        .bind(new.payable.kind)
        .bind(new.payable.id)
        .bind(&new.receipt_image)
        .bind(&new.transaction_id)
        .bind(&new.payment_method)
        .bind(&new.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if unique_violation(&e, "uniq_payments_pending") {
                AppError::Conflict("a pending payment for this item already exists".into())
            } else {
                AppError::from(e)
            }
        })?;

        tx.commit().await?;
        Ok(payment)
    }

    /// Admin approval. When the payment settles a booking, the booking is
    /// moved to approved in the same transaction.
    pub async fn approve_payment(
        &self,
        actor: &Actor,
        payment_id: Uuid,
    ) -> Result<PaymentReview, AppError> {
        actor_rules::ensure_can_review_payments(actor)?;

        let mut tx = self.pool().begin().await?;

        let payment = load_payment(&mut tx, payment_id).await?;
        payment_rules::ensure_can_approve(&payment)?;

        let updated = sqlx::query_as::<_, Payment>(
            r#"UPDATE payments
               SET status = 'approved', reviewed_by = $2, reviewed_at = NOW(), updated_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING *"#,
        )
        .bind(payment_id)
        .bind(actor.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("payment is no longer pending".into()))?;

        let booking_updated =
            cascade_booking(&mut tx, &updated, payment_rules::booking_cascade_on_approve).await?;

        tx.commit().await?;
        Ok(PaymentReview {
            payment: updated,
            booking_updated,
        })
    }

    /// Admin rejection of a claimed payment. A linked booking is rejected
    /// with it unless it already was.
    pub async fn mark_payment_failed(
        &self,
        actor: &Actor,
        payment_id: Uuid,
    ) -> Result<PaymentReview, AppError> {
        actor_rules::ensure_can_review_payments(actor)?;

        let mut tx = self.pool().begin().await?;

        let payment = load_payment(&mut tx, payment_id).await?;
        payment_rules::ensure_can_fail(&payment)?;

        let updated = sqlx::query_as::<_, Payment>(
            r#"UPDATE payments
               SET status = 'failed', reviewed_by = $2, reviewed_at = NOW(), updated_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING *"#,
        )
        .bind(payment_id)
        .bind(actor.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("payment is no longer pending".into()))?;

        let booking_updated =
            cascade_booking(&mut tx, &updated, payment_rules::booking_cascade_on_fail).await?;

        tx.commit().await?;
        Ok(PaymentReview {
            payment: updated,
            booking_updated,
        })
    }

    /// Removes a payment. Deleting a booking payment reopens the booking
    /// for a fresh attempt unless it is still pending. Returns the deleted
    /// row and whether the booking was touched; the caller cleans up the
    /// receipt blob after commit.
    pub async fn delete_payment(
        &self,
        actor: &Actor,
        payment_id: Uuid,
    ) -> Result<(Payment, bool), AppError> {
        let mut tx = self.pool().begin().await?;

        let payment = load_payment(&mut tx, payment_id).await?;
        payment_rules::ensure_can_delete(actor, &payment)?;

        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;

        let booking_updated =
            cascade_booking(&mut tx, &payment, payment_rules::booking_cascade_on_delete).await?;

        tx.commit().await?;
        Ok((payment, booking_updated))
    }

    /// Best-effort batch approval: each id runs through the full approval
    /// path in its own transaction, and one failure never aborts the rest.
    pub async fn bulk_approve_payments(
        &self,
        actor: &Actor,
        payment_ids: &[Uuid],
    ) -> Result<BulkApproveSummary, AppError> {
        actor_rules::ensure_can_review_payments(actor)?;

        let mut summary = BulkApproveSummary {
            approved: 0,
            failed: 0,
            errors: Vec::new(),
        };

        for &payment_id in payment_ids {
            match self.approve_payment(actor, payment_id).await {
                Ok(_) => summary.approved += 1,
                Err(e) => {
                    summary.failed += 1;
                    summary.errors.push(BulkFailure {
                        payment_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use sqlx::postgres::PgPoolOptions;

    fn store() -> PgStore {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/voyago_test")
            .unwrap();
        PgStore::new(pool)
    }

    // An empty batch never reaches the database, so the lazy pool stays
    // unconnected.
    #[tokio::test]
    async fn bulk_approving_an_empty_batch_returns_an_empty_summary() {
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        let summary = store().bulk_approve_payments(&admin, &[]).await.unwrap();

        assert_eq!(summary.approved, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn bulk_approval_is_admin_only() {
        let tourist = Actor::new(Uuid::new_v4(), Role::Tourist);
        let err = store()
            .bulk_approve_payments(&tourist, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden));
    }
}

/// Applies the booking-side consequence of a payment transition. The
/// decision function returns `None` when the booking is already where the
/// cascade would put it, which keeps replays idempotent.
async fn cascade_booking(
    conn: &mut PgConnection,
    payment: &Payment,
    decide: fn(BookingStatus) -> Option<BookingStatus>,
) -> Result<bool, AppError> {
    if payment.payable_kind != PayableKind::TourBooking {
        return Ok(false);
    }

    // The booking row can be gone if it was cancelled out from under a
    // dangling payment; the cascade then has nothing to do.
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(payment.payable_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(booking) = booking else {
        return Ok(false);
    };

    match decide(booking.status) {
        Some(next) => {
            set_booking_status(&mut *conn, booking.id, next).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
