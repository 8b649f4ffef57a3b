use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{parse_date, Message, RecordRequest};
use super::repo_types::{RecordDetails, RecordView};
use super::services;
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/records", get(list_records).post(create_record))
        .route("/records/date/:date", get(records_by_date))
        .route(
            "/records/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
}

#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn create_record(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<RecordRequest>,
) -> AppResult<(StatusCode, Json<RecordDetails>)> {
    let record = services::create(&state.db, user.id, body.product_id, body.weight).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_records(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<RecordDetails>>> {
    Ok(Json(services::list_all(&state.db, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_record(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<RecordDetails>> {
    Ok(Json(services::get_by_id(&state.db, id, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn records_by_date(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(date): Path<String>,
) -> AppResult<Json<Vec<RecordView>>> {
    let day = parse_date(&date)?;
    Ok(Json(services::list_by_date(&state.db, day, user.id).await?))
}

#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn update_record(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<RecordRequest>,
) -> AppResult<Json<RecordDetails>> {
    let record = services::update(&state.db, id, body.product_id, body.weight, user.id).await?;
    Ok(Json(record))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_record(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Message>> {
    services::delete(&state.db, id, user.id).await?;
    Ok(Json(Message {
        message: format!("Record with ID {id} deleted successfully."),
    }))
}
