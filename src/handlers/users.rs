use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::extract::CurrentUser;
use crate::models::activity::ActivityType;
use crate::models::user::{Role, User};
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::AppState;

/// Roles a caller may pick at registration. Admin accounts are provisioned
/// operationally and never through the public API.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterRole {
    Tourist,
    Guide,
}

impl From<RegisterRole> for Role {
    fn from(role: RegisterRole) -> Self {
        match role {
            RegisterRole::Tourist => Role::Tourist,
            RegisterRole::Guide => Role::Guide,
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub role: RegisterRole,
}

/// Registration response; the only place the api_token ever leaves the
/// server.
#[derive(Serialize)]
struct RegisteredUser {
    #[serde(flatten)]
    user: User,
    api_token: String,
}

fn generate_api_token() -> String {
    format!("vgo_{}", Uuid::new_v4().simple())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::invalid_field("name", "must not be empty"));
    }

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::invalid_field(
            "email",
            "must be a valid email address",
        ));
    }

    let api_token = generate_api_token();
    let user = state
        .store
        .insert_user(name, &email, req.role.into(), &api_token)
        .await?;

    state
        .store
        .log_activity(
            user.id,
            ActivityType::UserRegistered,
            json!({ "role": user.role }),
        )
        .await;
    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok(created(RegisteredUser { user, api_token }, "Account created").into_response())
}

pub async fn me(current: CurrentUser) -> Response {
    success(current.0, "OK").into_response()
}
