/// Tags for the append-only activity trail. Rows are written after the
/// triggering transaction commits, so a logging failure never rolls back
/// business state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    UserRegistered,
    TourCreated,
    PlanCreated,
    BookingCreated,
    BookingUpdated,
    BookingApproved,
    BookingRejected,
    BookingCancelled,
    PaymentCreated,
    PaymentApproved,
    PaymentFailed,
    PaymentDeleted,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::UserRegistered => "user_registered",
            ActivityType::TourCreated => "tour_created",
            ActivityType::PlanCreated => "plan_created",
            ActivityType::BookingCreated => "booking_created",
            ActivityType::BookingUpdated => "booking_updated",
            ActivityType::BookingApproved => "booking_approved",
            ActivityType::BookingRejected => "booking_rejected",
            ActivityType::BookingCancelled => "booking_cancelled",
            ActivityType::PaymentCreated => "payment_created",
            ActivityType::PaymentApproved => "payment_approved",
            ActivityType::PaymentFailed => "payment_failed",
            ActivityType::PaymentDeleted => "payment_deleted",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
