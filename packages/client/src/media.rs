//! Received media storage and outgoing media loading.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub const DEFAULT_MEDIA_DIR: &str = "received_media";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} has no file name")]
    NoFileName(PathBuf),
}

/// Where received media ends up
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Store `bytes` under `filename`, returning where they were written
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, MediaError>;
}

/// Writes each file under one directory, using the sender's filename as is.
///
/// Later files overwrite earlier ones with the same name.
#[derive(Debug, Clone)]
pub struct DirectoryMediaSink {
    dir: PathBuf,
}

impl DirectoryMediaSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MediaSink for DirectoryMediaSink {
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, MediaError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| MediaError::Io {
                path: self.dir.clone(),
                source,
            })?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| MediaError::Io {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("Stored {} byte(s) at {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// Read a file to send, returning its base name and contents
pub async fn load_media(path: &Path) -> Result<(String, Vec<u8>), MediaError> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| MediaError::NoFileName(path.to_path_buf()))?;
    let bytes = tokio::fs::read(path).await.map_err(|source| MediaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((filename, bytes))
}
