use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::extract::CurrentUser;
use crate::models::activity::ActivityType;
use crate::models::tour::{Tour, TourStats};
use crate::store::NewTour;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::workflow::actor as actor_rules;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateTourRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub price: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub capacity: Option<i32>,
}

#[derive(Serialize)]
struct TourDetail {
    #[serde(flatten)]
    tour: Tour,
    stats: TourStats,
}

pub async fn create_tour(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<CreateTourRequest>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    actor_rules::ensure_can_create_tour(&actor)?;

    if req.title.trim().is_empty() {
        return Err(AppError::invalid_field("title", "must not be empty"));
    }
    if req.location.trim().is_empty() {
        return Err(AppError::invalid_field("location", "must not be empty"));
    }
    if req.price <= Decimal::ZERO {
        return Err(AppError::invalid_field("price", "must be greater than zero"));
    }
    if let Some(end_date) = req.end_date {
        if end_date < req.start_date {
            return Err(AppError::invalid_field(
                "end_date",
                "must not be before start_date",
            ));
        }
    }
    if let Some(capacity) = req.capacity {
        if capacity <= 0 {
            return Err(AppError::invalid_field(
                "capacity",
                "must be greater than zero",
            ));
        }
    }

    let tour = state
        .store
        .insert_tour(&NewTour {
            guide_id: actor.id,
            title: req.title.trim().to_string(),
            description: req.description,
            location: req.location.trim().to_string(),
            price: req.price,
            start_date: req.start_date,
            end_date: req.end_date,
            capacity: req.capacity,
        })
        .await?;

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::TourCreated,
            json!({ "tour_id": tour.id }),
        )
        .await;
    tracing::info!(tour_id = %tour.id, guide_id = %actor.id, "Tour created");

    Ok(created(tour, "Tour created").into_response())
}

pub async fn list_tours(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let tours = state.store.list_tours().await?;
    Ok(success(tours, "OK").into_response())
}

pub async fn get_tour(
    State(state): State<Arc<AppState>>,
    Path(tour_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let tour = state.store.get_tour(tour_id).await?;
    let stats = state.store.tour_stats(tour_id).await?;

    Ok(success(TourDetail { tour, stats }, "OK").into_response())
}
