use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::extract::CurrentUser;
use crate::models::activity::ActivityType;
use crate::store::NewPlan;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::workflow::actor as actor_rules;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreatePlanRequest {
    pub title: String,
    pub details: Option<String>,
    pub total_price: Decimal,
}

pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<CreatePlanRequest>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    actor_rules::ensure_can_create_plan(&actor)?;

    if req.title.trim().is_empty() {
        return Err(AppError::invalid_field("title", "must not be empty"));
    }
    if req.total_price <= Decimal::ZERO {
        return Err(AppError::invalid_field(
            "total_price",
            "must be greater than zero",
        ));
    }

    let plan = state
        .store
        .insert_plan(&NewPlan {
            tourist_id: actor.id,
            title: req.title.trim().to_string(),
            details: req.details,
            total_price: req.total_price,
        })
        .await?;

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::PlanCreated,
            json!({ "plan_id": plan.id }),
        )
        .await;
    tracing::info!(plan_id = %plan.id, tourist_id = %actor.id, "Plan created");

    Ok(created(plan, "Plan created").into_response())
}

pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(plan_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let plan = state.store.get_plan(plan_id).await?;
    actor_rules::ensure_can_view_plan(&current.actor(), &plan)?;

    Ok(success(plan, "OK").into_response())
}
