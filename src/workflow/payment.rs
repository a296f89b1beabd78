use rust_decimal::Decimal;

use crate::models::booking::BookingStatus;
use crate::models::payment::{Payment, PaymentStatus};
use crate::workflow::actor::Actor;
use crate::workflow::error::WorkflowError;

/// Business cap on a single payment claim.
pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999, 2)
}

pub fn validate_amount(amount: Decimal) -> Result<(), WorkflowError> {
    if amount <= Decimal::ZERO {
        return Err(WorkflowError::validation(
            "amount",
            "must be greater than zero",
        ));
    }
    if amount > max_amount() {
        return Err(WorkflowError::validation(
            "amount",
            format!("must be at most {}", max_amount()),
        ));
    }
    Ok(())
}

/// One open payment per payer per payable. The partial unique index on the
/// payments table backs this up under concurrency.
pub fn ensure_no_duplicate(has_pending_for_payer: bool) -> Result<(), WorkflowError> {
    if has_pending_for_payer {
        Err(WorkflowError::Conflict(
            "a pending payment for this item already exists".into(),
        ))
    } else {
        Ok(())
    }
}

/// Payables that carry a fixed price (bookings) must be paid exactly; others
/// pass `None` and accept any valid amount.
pub fn ensure_amount_matches(
    amount: Decimal,
    expected: Option<Decimal>,
) -> Result<(), WorkflowError> {
    if let Some(expected) = expected {
        if amount != expected {
            return Err(WorkflowError::validation(
                "amount",
                format!("amount must match the booking total of {expected}"),
            ));
        }
    }
    Ok(())
}

pub fn ensure_can_approve(payment: &Payment) -> Result<(), WorkflowError> {
    match payment.status {
        PaymentStatus::Pending => Ok(()),
        PaymentStatus::Approved => Err(WorkflowError::InvalidState(
            "payment is already approved".into(),
        )),
        PaymentStatus::Failed => Err(WorkflowError::InvalidState(
            "payment has already been rejected".into(),
        )),
    }
}

pub fn ensure_can_fail(payment: &Payment) -> Result<(), WorkflowError> {
    match payment.status {
        PaymentStatus::Pending => Ok(()),
        PaymentStatus::Approved => Err(WorkflowError::InvalidState(
            "payment is already approved".into(),
        )),
        PaymentStatus::Failed => Err(WorkflowError::InvalidState(
            "payment has already been rejected".into(),
        )),
    }
}

/// Payers may withdraw a payment while it is still under review; admins may
/// remove one in any state (the booking cascade undoes an approval).
pub fn ensure_can_delete(actor: &Actor, payment: &Payment) -> Result<(), WorkflowError> {
    if actor.is_admin() {
        return Ok(());
    }
    if !actor.owns_payment(payment) {
        return Err(WorkflowError::Unauthorized);
    }
    if payment.status != PaymentStatus::Pending {
        return Err(WorkflowError::InvalidState(
            "only pending payments can be withdrawn".into(),
        ));
    }
    Ok(())
}

/// Booking transition implied by approving one of its payments. `None` means
/// the booking is left untouched.
pub fn booking_cascade_on_approve(current: BookingStatus) -> Option<BookingStatus> {
    (current == BookingStatus::Pending).then_some(BookingStatus::Approved)
}

/// Booking transition implied by rejecting one of its payments.
pub fn booking_cascade_on_fail(current: BookingStatus) -> Option<BookingStatus> {
    (current != BookingStatus::Rejected).then_some(BookingStatus::Rejected)
}

/// Booking transition implied by deleting one of its payments: the booking
/// goes back to awaiting payment, whatever state the review left it in.
pub fn booking_cascade_on_delete(current: BookingStatus) -> Option<BookingStatus> {
    (current != BookingStatus::Pending).then_some(BookingStatus::Pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment::PayableKind;
    use crate::models::user::Role;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn payment(payer_id: Uuid, status: PaymentStatus) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            payer_id,
            amount: dec!(300.00),
            status,
            payable_kind: PayableKind::TourBooking,
            payable_id: Uuid::new_v4(),
            receipt_image: None,
            transaction_id: None,
            payment_method: None,
            notes: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn amount_must_be_positive_and_within_the_column_bound() {
        assert!(validate_amount(dec!(0.01)).is_ok());
        assert!(validate_amount(dec!(999999.99)).is_ok());

        assert!(matches!(
            validate_amount(Decimal::ZERO),
            Err(WorkflowError::Validation { field: "amount", .. })
        ));
        assert!(matches!(
            validate_amount(dec!(-5.00)),
            Err(WorkflowError::Validation { field: "amount", .. })
        ));
        assert!(matches!(
            validate_amount(dec!(1000000.00)),
            Err(WorkflowError::Validation { field: "amount", .. })
        ));
    }

    #[test]
    fn duplicate_pending_payment_is_a_conflict() {
        assert!(ensure_no_duplicate(false).is_ok());
        assert!(matches!(
            ensure_no_duplicate(true),
            Err(WorkflowError::Conflict(_))
        ));
    }

    #[test]
    fn booking_payments_must_match_the_booking_total() {
        assert!(ensure_amount_matches(dec!(300.00), Some(dec!(300.00))).is_ok());
        // Scale differences are not mismatches.
        assert!(ensure_amount_matches(dec!(300.0), Some(dec!(300.00))).is_ok());

        match ensure_amount_matches(dec!(250.00), Some(dec!(300.00))) {
            Err(WorkflowError::Validation { field, message }) => {
                assert_eq!(field, "amount");
                assert!(message.contains("300.00"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn plan_payments_accept_any_valid_amount() {
        assert!(ensure_amount_matches(dec!(10.00), None).is_ok());
        assert!(ensure_amount_matches(dec!(987.65), None).is_ok());
    }

    #[test]
    fn review_transitions_only_leave_pending() {
        let payer = Uuid::new_v4();
        assert!(ensure_can_approve(&payment(payer, PaymentStatus::Pending)).is_ok());
        assert!(ensure_can_fail(&payment(payer, PaymentStatus::Pending)).is_ok());

        for terminal in [PaymentStatus::Approved, PaymentStatus::Failed] {
            assert!(matches!(
                ensure_can_approve(&payment(payer, terminal)),
                Err(WorkflowError::InvalidState(_))
            ));
            assert!(matches!(
                ensure_can_fail(&payment(payer, terminal)),
                Err(WorkflowError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn payers_withdraw_pending_payments_only() {
        let payer = Actor::new(Uuid::new_v4(), Role::Tourist);

        assert!(ensure_can_delete(&payer, &payment(payer.id, PaymentStatus::Pending)).is_ok());
        assert!(matches!(
            ensure_can_delete(&payer, &payment(payer.id, PaymentStatus::Approved)),
            Err(WorkflowError::InvalidState(_))
        ));
        assert!(matches!(
            ensure_can_delete(&payer, &payment(Uuid::new_v4(), PaymentStatus::Pending)),
            Err(WorkflowError::Unauthorized)
        ));
    }

    #[test]
    fn admins_delete_payments_in_any_state() {
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Approved,
            PaymentStatus::Failed,
        ] {
            assert!(ensure_can_delete(&admin, &payment(Uuid::new_v4(), status)).is_ok());
        }
    }

    #[test]
    fn approve_cascade_moves_pending_bookings_forward_only() {
        assert_eq!(
            booking_cascade_on_approve(BookingStatus::Pending),
            Some(BookingStatus::Approved)
        );
        assert_eq!(booking_cascade_on_approve(BookingStatus::Approved), None);
        assert_eq!(booking_cascade_on_approve(BookingStatus::Rejected), None);
    }

    #[test]
    fn fail_cascade_rejects_unless_already_rejected() {
        assert_eq!(
            booking_cascade_on_fail(BookingStatus::Pending),
            Some(BookingStatus::Rejected)
        );
        assert_eq!(
            booking_cascade_on_fail(BookingStatus::Approved),
            Some(BookingStatus::Rejected)
        );
        assert_eq!(booking_cascade_on_fail(BookingStatus::Rejected), None);
    }

    #[test]
    fn delete_cascade_reopens_the_booking() {
        assert_eq!(
            booking_cascade_on_delete(BookingStatus::Approved),
            Some(BookingStatus::Pending)
        );
        assert_eq!(
            booking_cascade_on_delete(BookingStatus::Rejected),
            Some(BookingStatus::Pending)
        );
        assert_eq!(booking_cascade_on_delete(BookingStatus::Pending), None);
    }
}
