use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{jwt::JwtKeys, repo_types::User};
use crate::{error::AppError, state::AppState};

/// Validates the bearer token and resolves its subject to a stored user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let username = JwtKeys::from_ref(state).verify(token.trim())?;

        // A deleted account looks exactly like a bad token.
        let user = User::find_by_username(&state.db, &username)
            .await?
            .ok_or_else(|| {
                warn!(%username, "token subject no longer exists");
                AppError::unauthorized()
            })?;

        Ok(AuthUser(user))
    }
}
