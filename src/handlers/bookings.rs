use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::extract::CurrentUser;
use crate::models::activity::ActivityType;
use crate::models::booking::Booking;
use crate::models::user::Role;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};
use crate::workflow::actor as actor_rules;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub tour_id: Uuid,
    pub participants_count: i32,
}

#[derive(Deserialize)]
pub struct UpdateBookingRequest {
    pub participants_count: i32,
}

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub tour_id: Option<Uuid>,
}

#[derive(Serialize)]
struct CreateBookingResponse {
    booking: Booking,
    next_step: &'static str,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    let today = Utc::now().date_naive();

    let booking = state
        .store
        .create_booking(&actor, req.tour_id, req.participants_count, today)
        .await?;

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::BookingCreated,
            json!({ "booking_id": booking.id, "tour_id": booking.tour_id }),
        )
        .await;
    tracing::info!(booking_id = %booking.id, tour_id = %booking.tour_id, "Booking created");

    Ok(created(
        CreateBookingResponse {
            booking,
            next_step: "create_payment",
        },
        "Booking created",
    )
    .into_response())
}

/// Listing is scoped by role: tourists see their own bookings, guides the
/// bookings on their tours, admins everything.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Response, AppError> {
    let actor = current.actor();

    let bookings = match actor.role {
        Role::Admin => state.store.list_all_bookings(query.tour_id).await?,
        Role::Guide => {
            state
                .store
                .list_bookings_for_guide(actor.id, query.tour_id)
                .await?
        }
        Role::Tourist => {
            let mut own = state.store.list_bookings_for_tourist(actor.id).await?;
            if let Some(tour_id) = query.tour_id {
                own.retain(|booking| booking.tour_id == tour_id);
            }
            own
        }
    };

    Ok(success(bookings, "OK").into_response())
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let booking = state.store.get_booking(booking_id).await?;
    let tour = state.store.get_tour(booking.tour_id).await?;
    actor_rules::ensure_can_view_booking(&current.actor(), &booking, &tour)?;

    Ok(success(booking, "OK").into_response())
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    let booking = state
        .store
        .update_booking_participants(&actor, booking_id, req.participants_count)
        .await?;

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::BookingUpdated,
            json!({ "booking_id": booking.id, "participants_count": booking.participants_count }),
        )
        .await;

    Ok(success(booking, "Booking updated").into_response())
}

pub async fn approve_booking(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    let booking = state.store.approve_booking(&actor, booking_id).await?;

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::BookingApproved,
            json!({ "booking_id": booking.id }),
        )
        .await;
    tracing::info!(booking_id = %booking.id, "Booking approved");

    Ok(success(booking, "Booking approved").into_response())
}

pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    let booking = state.store.reject_booking(&actor, booking_id).await?;

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::BookingRejected,
            json!({ "booking_id": booking.id }),
        )
        .await;
    tracing::info!(booking_id = %booking.id, "Booking rejected");

    Ok(success(booking, "Booking rejected").into_response())
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    let receipts = state.store.cancel_booking(&actor, booking_id).await?;

    // The rows are gone; losing a blob here only leaves an orphan file.
    for receipt in &receipts {
        if let Err(e) = state.receipts.delete(receipt).await {
            tracing::warn!(error = ?e, receipt = %receipt, "Failed to delete receipt blob");
        }
    }

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::BookingCancelled,
            json!({ "booking_id": booking_id }),
        )
        .await;
    tracing::info!(booking_id = %booking_id, "Booking cancelled");

    Ok(empty_success("Booking cancelled").into_response())
}
