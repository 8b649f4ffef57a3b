use axum::extract::multipart::{Field, Multipart};
use futures::{StreamExt, TryStreamExt};

use super::store::ByteStream;
use crate::error::{AppError, AppResult};

/// A file part of a multipart request, streamed straight into the image store.
pub struct ImageUpload<'a> {
    pub file_name: String,
    pub body: ByteStream<'a>,
}

pub async fn next_field(mp: &mut Multipart) -> AppResult<Option<Field<'_>>> {
    mp.next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Turns a part carrying a non-empty file name into an upload; other parts are dropped.
pub fn into_upload(field: Field<'_>) -> Option<ImageUpload<'_>> {
    let file_name = field.file_name().filter(|n| !n.is_empty())?.to_owned();
    let body = field
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        .boxed();
    Some(ImageUpload { file_name, body })
}
