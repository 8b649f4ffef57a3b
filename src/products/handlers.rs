use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{Message, ProductQuery};
use super::repo_types::Product;
use super::services;
use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    images::upload::{into_upload, next_field},
    state::AppState,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/name/:name", get(get_product_by_name))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/products", axum::routing::post(create_product))
        .route(
            "/products/:id",
            axum::routing::put(update_product).delete(delete_product),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

// --- handlers ---

#[instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(services::list_all(&state).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    Ok(Json(services::get_by_id(&state, id).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_product_by_name(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(name): Path<String>,
) -> AppResult<Json<Product>> {
    Ok(Json(services::get_by_name(&state, &name).await?))
}

/// POST /products?name=..&category=..&calories_per_100g=..
/// Optional multipart part `file` carries the image.
#[instrument(skip(state, user, mp), fields(user_id = user.id))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<ProductQuery>,
    mp: Option<Multipart>,
) -> AppResult<(StatusCode, Json<Product>)> {
    if let Some(mut mp) = mp {
        while let Some(field) = next_field(&mut mp).await? {
            if let Some(upload) = into_upload(field) {
                let product = services::create(&state, &q, Some(upload)).await?;
                return Ok((StatusCode::CREATED, Json(product)));
            }
        }
    }
    let product = services::create(&state, &q, None).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, user, mp), fields(user_id = user.id))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Query(q): Query<ProductQuery>,
    mp: Option<Multipart>,
) -> AppResult<Json<Product>> {
    if let Some(mut mp) = mp {
        while let Some(field) = next_field(&mut mp).await? {
            if let Some(upload) = into_upload(field) {
                return Ok(Json(services::update(&state, id, &q, Some(upload)).await?));
            }
        }
    }
    Ok(Json(services::update(&state, id, &q, None).await?))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Message>> {
    services::delete(&state, id).await?;
    Ok(Json(Message {
        message: format!("Product with ID {id} deleted successfully."),
    }))
}
