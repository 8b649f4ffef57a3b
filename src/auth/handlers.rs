use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Form, Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{
        Detail, PasswordChangeRequest, PublicUser, RegisterRequest, TokenForm, TokenResponse,
        UpdateUserRequest,
    },
    extractors::AuthUser,
    jwt::JwtKeys,
    services,
};
use crate::{error::AppResult, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(login))
        .route("/auth/read_current_user", get(read_current_user))
        .route("/auth/update", put(update_user))
        .route("/auth/change-password", put(change_password))
        .route("/auth/delete", delete(delete_user))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let user = services::register(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> AppResult<Json<TokenResponse>> {
    let user = services::authenticate(&state.db, &form.username, &form.password).await?;

    let access_token = JwtKeys::from_ref(&state).sign(&user.username)?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

#[instrument(skip_all)]
pub async fn read_current_user(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<PublicUser>> {
    let updated = services::update(&state.db, user.id, payload).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<PasswordChangeRequest>,
) -> AppResult<Json<Detail>> {
    services::change_password(
        &state.db,
        user.id,
        &payload.old_password,
        &payload.new_password,
    )
    .await?;
    Ok(Json(Detail::new("Password changed successfully")))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Detail>> {
    services::delete(&state.db, user.id).await?;
    Ok(Json(Detail::new("User deleted successfully")))
}
