use std::{convert::Infallible, path::PathBuf};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, instrument};

use super::upload::{into_upload, next_field};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/files/:name", get(download_file))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/files/upload", post(upload_file))
        .route(
            "/files/:name",
            axum::routing::put(replace_file).delete(delete_file),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

pub fn static_routes() -> Router<AppState> {
    Router::new().route("/static/:name", get(show_file))
}

// --- handlers ---

async fn serve(path: PathBuf, req: Request) -> Response {
    let res = ServeFile::new(path)
        .oneshot(req)
        .await
        .unwrap_or_else(|never: Infallible| match never {});
    res.into_response()
}

/// GET /files/:name, always as an attachment.
#[instrument(skip(state, req))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    req: Request,
) -> AppResult<Response> {
    let path = state.images.resolve(&name).await?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
        .map_err(|_| AppError::BadRequest(format!("invalid file name {name:?}")))?;

    let mut res = serve(path, req).await;
    if res.status() == StatusCode::OK {
        let headers = res.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(res)
}

/// GET /static/:name, inline with a content type guessed from the extension.
#[instrument(skip(state, req))]
pub async fn show_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    req: Request,
) -> AppResult<Response> {
    let path = state.images.resolve(&name).await?;
    Ok(serve(path, req).await)
}

#[instrument(skip(state, user, mp), fields(user_id = user.id))]
pub async fn upload_file(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut mp: Multipart,
) -> AppResult<(StatusCode, Json<FileResponse>)> {
    while let Some(field) = next_field(&mut mp).await? {
        if let Some(upload) = into_upload(field) {
            let reference = state.images.save(&upload.file_name, upload.body).await?;
            info!(%reference, "file uploaded");
            return Ok((
                StatusCode::CREATED,
                Json(FileResponse {
                    message: "File uploaded successfully".into(),
                    file_path: Some(reference),
                }),
            ));
        }
    }
    Err(AppError::BadRequest("file is required".into()))
}

#[instrument(skip(state, user, mp), fields(user_id = user.id))]
pub async fn replace_file(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(old_name): Path<String>,
    mut mp: Multipart,
) -> AppResult<Json<FileResponse>> {
    while let Some(field) = next_field(&mut mp).await? {
        if let Some(upload) = into_upload(field) {
            let reference = state
                .images
                .replace(&upload.file_name, upload.body, Some(&old_name))
                .await?;
            info!(%old_name, %reference, "file replaced");
            return Ok(Json(FileResponse {
                message: "File updated successfully".into(),
                file_path: Some(reference),
            }));
        }
    }
    Err(AppError::BadRequest("file is required".into()))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_file(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(name): Path<String>,
) -> AppResult<Json<FileResponse>> {
    state.images.delete(&name).await?;
    info!(%name, "file deleted");
    Ok(Json(FileResponse {
        message: format!("File '{name}' deleted successfully."),
        file_path: None,
    }))
}
