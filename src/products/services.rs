use tracing::{info, warn};

use super::dto::ProductQuery;
use super::repo;
use super::repo_types::Product;
use crate::error::{AppError, AppResult};
use crate::images::store::name_from_reference;
use crate::images::upload::ImageUpload;
use crate::state::AppState;

/// Upper-cases the first letter of every word and lower-cases the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn normalized(input: &ProductQuery) -> AppResult<(String, String)> {
    let name = input.name.trim();
    let category = input.category.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Product name must not be empty".into()));
    }
    if category.is_empty() {
        return Err(AppError::Validation("Product category must not be empty".into()));
    }
    if input.calories_per_100g < 0 {
        return Err(AppError::Validation("calories_per_100g must be >= 0".into()));
    }
    Ok((title_case(name), title_case(category)))
}

/// Cleanup that must never fail the operation it follows.
async fn discard_image(state: &AppState, reference: &str) {
    match state.images.delete(name_from_reference(reference)).await {
        Ok(()) => {}
        Err(AppError::NotFound(_)) => warn!(%reference, "image already gone"),
        Err(e) => warn!(error = %e, %reference, "failed to delete image"),
    }
}

/// The image is written before the row, so a failed upload leaves no product behind.
pub async fn create(
    state: &AppState,
    input: &ProductQuery,
    image: Option<ImageUpload<'_>>,
) -> AppResult<Product> {
    let (name, category) = normalized(input)?;

    let image_url = match image {
        Some(upload) => Some(state.images.save(&upload.file_name, upload.body).await?),
        None => None,
    };

    let product = repo::insert(
        &state.db,
        &name,
        &category,
        input.calories_per_100g,
        image_url.as_deref(),
    )
    .await?;

    info!(product_id = product.id, name = %product.name, "product created");
    Ok(product)
}

pub async fn list_all(state: &AppState) -> AppResult<Vec<Product>> {
    Ok(repo::list_all(&state.db).await?)
}

pub async fn get_by_id(state: &AppState, id: i64) -> AppResult<Product> {
    repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))
}

pub async fn get_by_name(state: &AppState, name: &str) -> AppResult<Product> {
    repo::find_by_name(&state.db, name)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))
}

/// Full replace of the scalar fields. A new image is stored first and the
/// previous file is only removed once the row points at the new one.
pub async fn update(
    state: &AppState,
    id: i64,
    input: &ProductQuery,
    image: Option<ImageUpload<'_>>,
) -> AppResult<Product> {
    let (name, category) = normalized(input)?;
    let existing = get_by_id(state, id).await?;

    let new_image = match image {
        Some(upload) => Some(state.images.save(&upload.file_name, upload.body).await?),
        None => None,
    };

    let product = repo::update(
        &state.db,
        id,
        &name,
        &category,
        input.calories_per_100g,
        new_image.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    if let (Some(new), Some(old)) = (&new_image, &existing.image_url) {
        if name_from_reference(new) != name_from_reference(old) {
            discard_image(state, old).await;
        }
    }

    info!(product_id = id, "product updated");
    Ok(product)
}

/// Removes the row, then makes a best-effort attempt at its image.
pub async fn delete(state: &AppState, id: i64) -> AppResult<()> {
    let product = get_by_id(state, id).await?;

    let deleted = repo::delete(&state.db, id).await.map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("Product is used by existing records".into()),
        other => other,
    })?;
    if !deleted {
        return Err(AppError::not_found("Product not found"));
    }

    if let Some(reference) = &product.image_url {
        discard_image(state, reference).await;
    }

    info!(product_id = id, "product deleted");
    Ok(())
}
