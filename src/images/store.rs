use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Public prefix of every stored image reference, matching the `/static/:name` route.
pub const REFERENCE_PREFIX: &str = "static";

/// Chunked upload body; never buffered whole.
pub type ByteStream<'a> = BoxStream<'a, std::io::Result<Bytes>>;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the upload under a name derived from `file_name` and returns its reference.
    async fn save<'a>(&self, file_name: &str, body: ByteStream<'a>) -> AppResult<String>;
    /// Stores the new upload, then removes `old_reference` if it still exists.
    async fn replace<'a>(
        &self,
        file_name: &str,
        body: ByteStream<'a>,
        old_reference: Option<&str>,
    ) -> AppResult<String>;
    async fn resolve(&self, name: &str) -> AppResult<PathBuf>;
    async fn delete(&self, name: &str) -> AppResult<()>;
}

/// Images kept as plain files in one directory.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    async fn write_stream(&self, path: &Path, mut body: ByteStream<'_>) -> AppResult<u64> {
        let mut file = fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(format!("upload interrupted: {e}")))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save<'a>(&self, file_name: &str, body: ByteStream<'a>) -> AppResult<String> {
        let name = stored_name(file_name)?;
        self.ensure_root().await?;

        let target = self.root.join(&name);
        let staging = self.root.join(format!(".{}.part", Uuid::new_v4()));

        let written = match self.write_stream(&staging, body).await {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&staging).await;
                return Err(e);
            }
        };
        if let Err(e) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(AppError::Internal(e.into()));
        }

        debug!(file = %name, bytes = written, "image stored");
        Ok(reference_for(&name))
    }

    async fn replace<'a>(
        &self,
        file_name: &str,
        body: ByteStream<'a>,
        old_reference: Option<&str>,
    ) -> AppResult<String> {
        let old_name = old_reference.map(name_from_reference).map(checked_name).transpose()?;

        let reference = self.save(file_name, body).await?;
        let new_name = name_from_reference(&reference);

        if let Some(old) = old_name.filter(|old| *old != new_name) {
            match fs::remove_file(self.root.join(old)).await {
                Ok(()) => debug!(file = %old, "replaced image removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(error = %e, file = %old, "failed to remove replaced image"),
            }
        }
        Ok(reference)
    }

    async fn resolve(&self, name: &str) -> AppResult<PathBuf> {
        let path = self.root.join(checked_name(name)?);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(AppError::not_found("File not found")),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, name: &str) -> AppResult<()> {
        let name = checked_name(name)?;
        fs::remove_file(self.root.join(name)).await?;
        debug!(file = %name, "image deleted");
        Ok(())
    }
}

/// Reference stored on a product for an image file name.
pub fn reference_for(name: &str) -> String {
    format!("{REFERENCE_PREFIX}/{name}")
}

/// Last path segment of a stored reference.
pub fn name_from_reference(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// Upload base name up to the first dot, plus the original extension.
pub fn stored_name(upload_name: &str) -> AppResult<String> {
    let base = upload_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    let stem = base.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        return Err(AppError::BadRequest(format!("invalid file name {upload_name:?}")));
    }

    let name = match Path::new(base).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem.to_string(),
    };
    checked_name(&name)?;
    Ok(name)
}

fn checked_name(name: &str) -> AppResult<&str> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
        || name.contains("..");
    if bad {
        return Err(AppError::BadRequest(format!("invalid file name {name:?}")));
    }
    Ok(name)
}
