use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::models::user::User;
use crate::utils::error::AppError;
use crate::workflow::Actor;
use crate::AppState;

/// The authenticated user, resolved from the `Authorization: Bearer` token.
/// Handlers take this as an argument; there is no ambient identity.
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::from_user(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::AuthError("missing bearer token".into()))?;

        let user = state
            .store
            .find_user_by_token(token)
            .await?
            .ok_or_else(|| AppError::AuthError("invalid bearer token".into()))?;

        Ok(CurrentUser(user))
    }
}
