// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local storage for uploaded images and resolution of server-side image links

use std::path::{Path, PathBuf};

use sanitize_filename::sanitize;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Path is outside the allowed directory: {}", .0.display())]
    OutsideRoot(PathBuf),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory-backed store for uploads
///
/// Every stored file gets a fresh UUID prefix so concurrent uploads that
/// share a client file name never overwrite each other.
#[derive(Debug, Clone)]
pub struct UploadStore {
    upload_dir: PathBuf,
    link_root: Option<PathBuf>,
}

impl UploadStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            link_root: None,
        }
    }

    /// Restrict `resolve_link` to paths inside `root`
    pub fn with_link_root(mut self, root: Option<PathBuf>) -> Self {
        self.link_root = root;
        self
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Create the upload directory if missing
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }

    /// `<uuid>_<sanitized name>`; falls back to `upload` when sanitizing
    /// leaves nothing
    pub fn unique_name(original: Option<&str>) -> String {
        let sanitized = original.map(sanitize).unwrap_or_default();
        let base = if sanitized.is_empty() {
            "upload".to_string()
        } else {
            sanitized
        };
        format!("{}_{}", Uuid::new_v4(), base)
    }

    /// Write uploaded bytes and return the stored path
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        self.ensure_dir().await?;

        let path = self.upload_dir.join(Self::unique_name(original_name));
        let mut file = fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        tracing::debug!("Stored upload ({} bytes) at {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Resolve a client supplied `doc_file_name` to an existing file
    ///
    /// Without a link root any existing path is accepted. With one, relative
    /// names are joined to the root and the canonical result must stay inside
    /// it.
    pub fn resolve_link(&self, doc_file_name: &str) -> Result<PathBuf, StorageError> {
        let name = doc_file_name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidName(doc_file_name.to_string()));
        }

        let requested = PathBuf::from(name);

        let Some(root) = &self.link_root else {
            if !requested.is_file() {
                return Err(StorageError::NotFound(requested));
            }
            return Ok(requested);
        };

        let candidate = if requested.is_absolute() {
            requested.clone()
        } else {
            root.join(&requested)
        };

        if !candidate.is_file() {
            return Err(StorageError::NotFound(requested));
        }

        let root = std::fs::canonicalize(root)?;
        let resolved = std::fs::canonicalize(&candidate)?;
        if !resolved.starts_with(&root) {
            return Err(StorageError::OutsideRoot(requested));
        }

        Ok(resolved)
    }
}
