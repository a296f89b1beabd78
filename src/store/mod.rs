pub mod bookings;
pub mod payments;
pub mod receipts;

pub use payments::{BulkApproveSummary, BulkFailure, NewPayment, PaymentReview};
pub use receipts::ReceiptStore;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::activity::ActivityType;
use crate::models::plan::Plan;
use crate::models::tour::{Tour, TourStats};
use crate::models::user::{Role, User};
use crate::utils::error::AppError;

/// All database access goes through this store. Methods return domain rows
/// and `AppError`, so handlers never see raw sqlx types.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// True when `err` is a violation of the named unique constraint. Used to
/// translate index-level duplicate races into the same business error the
/// in-transaction check would have produced.
fn unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
                && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}

pub struct NewTour {
    pub guide_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub price: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub capacity: Option<i32>,
}

pub struct NewPlan {
    pub tourist_id: Uuid,
    pub title: String,
    pub details: Option<String>,
    pub total_price: Decimal,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -- User Operations --

    pub async fn insert_user(
        &self,
        name: &str,
        email: &str,
        role: Role,
        api_token: &str,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, role, api_token) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(api_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if unique_violation(&e, "users_email_key") {
                AppError::Conflict("email is already registered".into())
            } else {
                AppError::from(e)
            }
        })?;

        Ok(user)
    }

    pub async fn find_user_by_token(&self, api_token: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE api_token = $1")
            .bind(api_token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // -- Tour Operations --

    pub async fn insert_tour(&self, tour: &NewTour) -> Result<Tour, AppError> {
        let row = sqlx::query_as::<_, Tour>(
            r#"INSERT INTO tours (guide_id, title, description, location, price, start_date, end_date, capacity)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(tour.guide_id)
        .bind(&tour.title)
        .bind(&tour.description)
        .bind(&tour.location)
        .bind(tour.price)
        .bind(tour.start_date)
        .bind(tour.end_date)
        .bind(tour.capacity)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_tour(&self, id: Uuid) -> Result<Tour, AppError> {
        sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list_tours(&self) -> Result<Vec<Tour>, AppError> {
        let rows = sqlx::query_as::<_, Tour>(
            "SELECT * FROM tours ORDER BY start_date ASC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Aggregate counts shown on the tour detail view.
    pub async fn tour_stats(&self, tour_id: Uuid) -> Result<TourStats, AppError> {
        let stats = sqlx::query_as::<_, TourStats>(
            r#"SELECT
                 (SELECT COUNT(*) FROM bookings WHERE tour_id = $1) AS bookings_count,
                 (SELECT COUNT(*) FROM bookings WHERE tour_id = $1 AND status = 'approved') AS approved_bookings_count,
                 (SELECT COUNT(*) FROM payments p
                    JOIN bookings b ON b.id = p.payable_id
                  WHERE p.payable_kind = 'tour_bookings' AND b.tour_id = $1) AS payments_count"#,
        )
        .bind(tour_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    // -- Plan Operations --

    pub async fn insert_plan(&self, plan: &NewPlan) -> Result<Plan, AppError> {
        let row = sqlx::query_as::<_, Plan>(
            r#"INSERT INTO plans (tourist_id, title, details, total_price)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(plan.tourist_id)
        .bind(&plan.title)
        .bind(&plan.details)
        .bind(plan.total_price)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_plan(&self, id: Uuid) -> Result<Plan, AppError> {
        sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    // -- Activity Trail --

    /// Best-effort append to the activity trail. Called after the business
    /// transaction commits; failures are logged and swallowed.
    pub async fn log_activity(
        &self,
        user_id: Uuid,
        activity: ActivityType,
        details: serde_json::Value,
    ) {
        let result = sqlx::query(
            "INSERT INTO activity_logs (user_id, activity_type, details) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(activity.as_str())
        .bind(details)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = ?e, activity = %activity, "Failed to record activity");
        }
    }
}
