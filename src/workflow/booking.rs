use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::booking::{Booking, BookingStatus};
use crate::models::tour::Tour;
use crate::workflow::actor::Actor;
use crate::workflow::error::WorkflowError;

pub const MIN_PARTICIPANTS: i32 = 1;
pub const MAX_PARTICIPANTS: i32 = 50;

pub fn validate_participants(participants_count: i32) -> Result<(), WorkflowError> {
    if participants_count < MIN_PARTICIPANTS {
        return Err(WorkflowError::validation(
            "participants_count",
            format!("must be at least {MIN_PARTICIPANTS}"),
        ));
    }
    if participants_count > MAX_PARTICIPANTS {
        return Err(WorkflowError::validation(
            "participants_count",
            format!("must be at most {MAX_PARTICIPANTS}"),
        ));
    }
    Ok(())
}

/// The booking total is always derived server-side from the tour price.
pub fn booking_amount(tour_price: Decimal, participants_count: i32) -> Decimal {
    tour_price * Decimal::from(participants_count)
}

/// Gate for creating a booking. `has_active_booking` is true when the tourist
/// already holds a non-rejected booking for this tour; `today` comes from the
/// caller so the rule stays a pure function of its inputs.
pub fn ensure_can_create(
    actor: &Actor,
    tour: &Tour,
    participants_count: i32,
    has_active_booking: bool,
    today: NaiveDate,
) -> Result<(), WorkflowError> {
    validate_participants(participants_count)?;
    if tour.start_date < today {
        return Err(WorkflowError::validation(
            "tour_id",
            "tour start date has already passed",
        ));
    }
    if actor.id == tour.guide_id {
        return Err(WorkflowError::validation(
            "tour_id",
            "guides cannot book their own tours",
        ));
    }
    if has_active_booking {
        return Err(WorkflowError::validation(
            "tour_id",
            "you already have an active booking for this tour",
        ));
    }
    Ok(())
}

/// A booking is approvable only while pending and only once a payment for it
/// has been approved.
pub fn ensure_can_approve(
    booking: &Booking,
    has_approved_payment: bool,
) -> Result<(), WorkflowError> {
    match booking.status {
        BookingStatus::Approved => Err(WorkflowError::InvalidState(
            "booking is already approved".into(),
        )),
        BookingStatus::Rejected => Err(WorkflowError::InvalidState(
            "booking has been rejected".into(),
        )),
        BookingStatus::Pending => {
            if has_approved_payment {
                Ok(())
            } else {
                Err(WorkflowError::Precondition(
                    "booking has no approved payment".into(),
                ))
            }
        }
    }
}

/// Rejection is terminal, so re-rejecting is refused; an approved booking
/// may still be rejected (the guide revokes it).
pub fn ensure_can_reject(booking: &Booking) -> Result<(), WorkflowError> {
    if booking.status == BookingStatus::Rejected {
        return Err(WorkflowError::InvalidState(
            "booking is already rejected".into(),
        ));
    }
    Ok(())
}

/// A pending booking can always be cancelled (its pending payments are
/// discarded with it). Once a booking carries an approved payment the money
/// question has to be settled first.
pub fn ensure_can_cancel(
    booking: &Booking,
    has_approved_payment: bool,
) -> Result<(), WorkflowError> {
    if booking.status == BookingStatus::Pending {
        return Ok(());
    }
    if has_approved_payment {
        return Err(WorkflowError::Conflict(
            "booking has an approved payment; reject the payment before cancelling".into(),
        ));
    }
    Ok(())
}

pub fn ensure_can_update_participants(
    booking: &Booking,
    participants_count: i32,
) -> Result<(), WorkflowError> {
    validate_participants(participants_count)?;
    if booking.status != BookingStatus::Pending {
        return Err(WorkflowError::InvalidState(
            "only pending bookings can be modified".into(),
        ));
    }
    Ok(())
}

/// Gate for attaching a new payment to a booking. One payment under review
/// at a time, and only while the booking itself is still pending.
pub fn ensure_can_receive_payment(
    booking: &Booking,
    has_pending_payment: bool,
) -> Result<(), WorkflowError> {
    if booking.status != BookingStatus::Pending {
        return Err(WorkflowError::Precondition(
            "booking is not awaiting payment".into(),
        ));
    }
    if has_pending_payment {
        return Err(WorkflowError::Precondition(
            "booking already has a payment under review".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn tour(guide_id: Uuid, start_date: NaiveDate) -> Tour {
        Tour {
            id: Uuid::new_v4(),
            guide_id,
            title: "Old town walk".into(),
            description: None,
            location: "Porto".into(),
            price: dec!(100.00),
            start_date,
            end_date: None,
            capacity: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            tour_id: Uuid::new_v4(),
            tourist_id: Uuid::new_v4(),
            participants_count: 3,
            amount: dec!(300.00),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn participants_must_stay_within_bounds() {
        assert!(validate_participants(1).is_ok());
        assert!(validate_participants(50).is_ok());

        for bad in [0, -1, 51] {
            match validate_participants(bad) {
                Err(WorkflowError::Validation { field, .. }) => {
                    assert_eq!(field, "participants_count")
                }
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn amount_is_price_times_participants() {
        assert_eq!(booking_amount(dec!(100.00), 3), dec!(300.00));
        assert_eq!(booking_amount(dec!(19.99), 2), dec!(39.98));
        assert_eq!(booking_amount(dec!(0.01), 50), dec!(0.50));
    }

    #[test]
    fn booking_a_tour_starting_today_is_allowed() {
        let actor = Actor::new(Uuid::new_v4(), Role::Tourist);
        let t = tour(Uuid::new_v4(), today());
        assert!(ensure_can_create(&actor, &t, 2, false, today()).is_ok());
    }

    #[test]
    fn booking_a_past_tour_is_refused() {
        let actor = Actor::new(Uuid::new_v4(), Role::Tourist);
        let t = tour(Uuid::new_v4(), today().pred_opt().unwrap());
        match ensure_can_create(&actor, &t, 2, false, today()) {
            Err(WorkflowError::Validation { field, message }) => {
                assert_eq!(field, "tour_id");
                assert!(message.contains("passed"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn guides_cannot_book_their_own_tour() {
        let guide = Actor::new(Uuid::new_v4(), Role::Guide);
        let t = tour(guide.id, today());
        match ensure_can_create(&guide, &t, 2, false, today()) {
            Err(WorkflowError::Validation { field, .. }) => assert_eq!(field, "tour_id"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn a_second_active_booking_for_the_same_tour_is_refused() {
        let actor = Actor::new(Uuid::new_v4(), Role::Tourist);
        let t = tour(Uuid::new_v4(), today());
        match ensure_can_create(&actor, &t, 2, true, today()) {
            Err(WorkflowError::Validation { field, message }) => {
                assert_eq!(field, "tour_id");
                assert!(message.contains("active booking"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn approval_requires_a_pending_booking_with_approved_payment() {
        assert!(ensure_can_approve(&booking(BookingStatus::Pending), true).is_ok());

        assert_eq!(
            ensure_can_approve(&booking(BookingStatus::Pending), false),
            Err(WorkflowError::Precondition(
                "booking has no approved payment".into()
            ))
        );
        assert!(matches!(
            ensure_can_approve(&booking(BookingStatus::Approved), true),
            Err(WorkflowError::InvalidState(_))
        ));
        assert!(matches!(
            ensure_can_approve(&booking(BookingStatus::Rejected), true),
            Err(WorkflowError::InvalidState(_))
        ));
    }

    #[test]
    fn rejecting_twice_is_refused_but_approved_can_be_rejected() {
        assert!(ensure_can_reject(&booking(BookingStatus::Pending)).is_ok());
        assert!(ensure_can_reject(&booking(BookingStatus::Approved)).is_ok());
        assert!(matches!(
            ensure_can_reject(&booking(BookingStatus::Rejected)),
            Err(WorkflowError::InvalidState(_))
        ));
    }

    #[test]
    fn cancel_rules_hinge_on_the_approved_payment() {
        assert!(ensure_can_cancel(&booking(BookingStatus::Pending), false).is_ok());
        assert!(ensure_can_cancel(&booking(BookingStatus::Rejected), false).is_ok());
        assert!(ensure_can_cancel(&booking(BookingStatus::Approved), false).is_ok());

        assert!(matches!(
            ensure_can_cancel(&booking(BookingStatus::Approved), true),
            Err(WorkflowError::Conflict(_))
        ));
    }

    #[test]
    fn only_pending_bookings_accept_participant_changes() {
        assert!(ensure_can_update_participants(&booking(BookingStatus::Pending), 5).is_ok());
        assert!(matches!(
            ensure_can_update_participants(&booking(BookingStatus::Approved), 5),
            Err(WorkflowError::InvalidState(_))
        ));
        assert!(matches!(
            ensure_can_update_participants(&booking(BookingStatus::Pending), 0),
            Err(WorkflowError::Validation { .. })
        ));
    }

    #[test]
    fn payment_intake_requires_pending_booking_without_open_payment() {
        assert!(ensure_can_receive_payment(&booking(BookingStatus::Pending), false).is_ok());

        assert!(matches!(
            ensure_can_receive_payment(&booking(BookingStatus::Pending), true),
            Err(WorkflowError::Precondition(_))
        ));
        assert!(matches!(
            ensure_can_receive_payment(&booking(BookingStatus::Approved), false),
            Err(WorkflowError::Precondition(_))
        ));
        assert!(matches!(
            ensure_can_receive_payment(&booking(BookingStatus::Rejected), false),
            Err(WorkflowError::Precondition(_))
        ));
    }
}
