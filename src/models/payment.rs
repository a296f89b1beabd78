use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::booking::Booking;
use crate::models::plan::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which table a payment settles. Stored alongside `payable_id` as a tagged
/// reference; the wire values match the public API ("tour_bookings"/"plans").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum PayableKind {
    #[serde(rename = "tour_bookings")]
    #[sqlx(rename = "tour_bookings")]
    TourBooking,
    #[serde(rename = "plans")]
    #[sqlx(rename = "plans")]
    Plan,
}

/// Tagged reference to the entity a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayableRef {
    pub kind: PayableKind,
    pub id: Uuid,
}

/// A payable reference resolved to its row. Booking payables participate in
/// the approval cascades; plan payables do not.
#[derive(Debug, Clone)]
pub enum Payable {
    Booking(Booking),
    Plan(Plan),
}

impl Payable {
    /// The user who owes this payable (and is the only permitted payer).
    pub fn owner_id(&self) -> Uuid {
        match self {
            Payable::Booking(b) => b.tourist_id,
            Payable::Plan(p) => p.tourist_id,
        }
    }

    /// The exact amount a payment must carry, where one is enforced.
    /// Booking payments must match the booking total; plan payments are
    /// free-form contributions.
    pub fn expected_amount(&self) -> Option<Decimal> {
        match self {
            Payable::Booking(b) => Some(b.amount),
            Payable::Plan(_) => None,
        }
    }
}

/// A claimed payment: an uploaded receipt awaiting admin review, not a
/// processed gateway transaction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub payer_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payable_kind: PayableKind,
    pub payable_id: Uuid,
    pub receipt_image: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
