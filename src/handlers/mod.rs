pub mod bookings;
pub mod payments;
pub mod plans;
pub mod tours;
pub mod users;

use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::utils::response::success;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "voyago-api",
    };

    success(payload, "Health check successful").into_response()
}
