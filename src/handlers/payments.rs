use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::extract::CurrentUser;
use crate::models::activity::ActivityType;
use crate::models::payment::{PayableKind, PayableRef, Payment, PaymentStatus};
use crate::store::NewPayment;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};
use crate::workflow::actor as actor_rules;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    pub payable_type: PayableKind,
    pub payable_id: Uuid,
    /// Base64-encoded image bytes.
    pub receipt_image: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ListPaymentsQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct BulkApproveRequest {
    pub payment_ids: Vec<Uuid>,
}

#[derive(Serialize)]
struct CreatePaymentResponse {
    payment: Payment,
    next_step: &'static str,
}

pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Response, AppError> {
    let actor = current.actor();

    let receipt_path = match req.receipt_image.as_deref() {
        Some(encoded) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|_| {
                    AppError::invalid_field("receipt_image", "must be valid base64 image data")
                })?;
            let path = state.receipts.save(&bytes).await.map_err(|e| {
                AppError::InternalServerError(format!("failed to store receipt: {e}"))
            })?;
            Some(path)
        }
        None => None,
    };

    let result = state
        .store
        .create_payment(
            &actor,
            NewPayment {
                payable: PayableRef {
                    kind: req.payable_type,
                    id: req.payable_id,
                },
                amount: req.amount,
                receipt_image: receipt_path.clone(),
                transaction_id: req.transaction_id,
                payment_method: req.payment_method,
                notes: req.notes,
            },
        )
        .await;

    let payment = match result {
        Ok(payment) => payment,
        Err(e) => {
            // The claim was refused, so the blob written above is orphaned.
            if let Some(path) = receipt_path {
                if let Err(cleanup) = state.receipts.delete(&path).await {
                    tracing::warn!(error = ?cleanup, receipt = %path, "Failed to clean up receipt blob");
                }
            }
            return Err(e);
        }
    };

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::PaymentCreated,
            json!({
                "payment_id": payment.id,
                "payable_type": payment.payable_kind,
                "payable_id": payment.payable_id,
            }),
        )
        .await;
    tracing::info!(payment_id = %payment.id, amount = %payment.amount, "Payment submitted");

    Ok(created(
        CreatePaymentResponse {
            payment,
            next_step: "wait_for_approval",
        },
        "Payment submitted for review",
    )
    .into_response())
}

/// Admin review queue. Defaults to pending; `?status=all` lists everything.
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Response, AppError> {
    actor_rules::ensure_can_review_payments(&current.actor())?;

    let status = match query.status.as_deref() {
        None | Some("pending") => Some(PaymentStatus::Pending),
        Some("approved") => Some(PaymentStatus::Approved),
        Some("failed") => Some(PaymentStatus::Failed),
        Some("all") => None,
        Some(_) => {
            return Err(AppError::invalid_field(
                "status",
                "must be one of pending, approved, failed, all",
            ))
        }
    };

    let payments = state.store.list_payments(status).await?;
    Ok(success(payments, "OK").into_response())
}

pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(payment_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let payment = state.store.get_payment(payment_id).await?;
    actor_rules::ensure_can_view_payment(&current.actor(), &payment)?;

    Ok(success(payment, "OK").into_response())
}

pub async fn approve_payment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(payment_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    let review = state.store.approve_payment(&actor, payment_id).await?;

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::PaymentApproved,
            json!({
                "payment_id": review.payment.id,
                "booking_updated": review.booking_updated,
            }),
        )
        .await;
    tracing::info!(
        payment_id = %review.payment.id,
        booking_updated = review.booking_updated,
        "Payment approved"
    );

    Ok(success(review, "Payment approved").into_response())
}

pub async fn reject_payment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(payment_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    let review = state.store.mark_payment_failed(&actor, payment_id).await?;

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::PaymentFailed,
            json!({
                "payment_id": review.payment.id,
                "booking_updated": review.booking_updated,
            }),
        )
        .await;
    tracing::info!(payment_id = %review.payment.id, "Payment rejected");

    Ok(success(review, "Payment rejected").into_response())
}

pub async fn bulk_approve(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<BulkApproveRequest>,
) -> Result<Response, AppError> {
    let actor = current.actor();

    let summary = state
        .store
        .bulk_approve_payments(&actor, &req.payment_ids)
        .await?;

    tracing::info!(
        approved = summary.approved,
        failed = summary.failed,
        "Bulk payment approval finished"
    );

    Ok(success(summary, "Bulk approval finished").into_response())
}

pub async fn delete_payment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(payment_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let actor = current.actor();
    let (payment, booking_updated) = state.store.delete_payment(&actor, payment_id).await?;

    if let Some(receipt) = &payment.receipt_image {
        if let Err(e) = state.receipts.delete(receipt).await {
            tracing::warn!(error = ?e, receipt = %receipt, "Failed to delete receipt blob");
        }
    }

    state
        .store
        .log_activity(
            actor.id,
            ActivityType::PaymentDeleted,
            json!({
                "payment_id": payment.id,
                "booking_updated": booking_updated,
            }),
        )
        .await;
    tracing::info!(payment_id = %payment.id, booking_updated, "Payment deleted");

    Ok(empty_success("Payment deleted").into_response())
}
