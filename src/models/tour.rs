use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tour {
    pub id: Uuid,
    pub guide_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub price: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub capacity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived booking/payment aggregates for a single tour.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TourStats {
    pub bookings_count: i64,
    pub approved_bookings_count: i64,
    pub payments_count: i64,
}
