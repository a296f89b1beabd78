use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Success envelope: every 2xx body is `{success, data, message}`.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

fn envelope<T: Serialize>(
    status: StatusCode,
    data: Option<T>,
    message: String,
) -> (StatusCode, Json<ApiResponse<T>>) {
    let body = ApiResponse {
        success: true,
        data,
        message: Some(message),
    };
    (status, Json(body))
}

pub fn success<T: Serialize>(data: T, message: impl Into<String>) -> impl IntoResponse {
    envelope(StatusCode::OK, Some(data), message.into())
}

/// 201 variant for resource creation endpoints.
pub fn created<T: Serialize>(data: T, message: impl Into<String>) -> impl IntoResponse {
    envelope(StatusCode::CREATED, Some(data), message.into())
}

pub fn empty_success(message: impl Into<String>) -> impl IntoResponse {
    envelope::<()>(StatusCode::OK, None, message.into())
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ApiErrorBody {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    };

    (status, Json(body)).into_response()
}
