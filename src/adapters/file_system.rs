use std::path::{Path, PathBuf};

use crate::ports::file_system::{FileSystem, FileSystemError, FileSystemResult};

/// File system adapter backed by `tokio::fs`
#[derive(Debug, Default, Clone)]
pub struct FileSystemAdapter;

impl FileSystemAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `path` under `root`, refusing anything that escapes it.
    ///
    /// Returns `NotFound` when the file (or the root) does not exist.
    async fn resolve(root: &str, path: &str) -> FileSystemResult<PathBuf> {
        let relative = path.trim_start_matches('/');
        if Path::new(relative)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(FileSystemError::InvalidPath(
                "Path traversal attempt detected".to_string(),
            ));
        }

        let full_path = Path::new(root).join(relative);

        let canonical_root = match tokio::fs::canonicalize(root).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FileSystemError::NotFound(full_path.display().to_string()));
            }
            Err(e) => return Err(FileSystemError::IoError(e)),
        };
        let canonical_path = match tokio::fs::canonicalize(&full_path).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FileSystemError::NotFound(full_path.display().to_string()));
            }
            Err(e) => return Err(FileSystemError::IoError(e)),
        };

        // Symlinks may still point outside the root.
        if !canonical_path.starts_with(&canonical_root) {
            return Err(FileSystemError::InvalidPath(
                "Path traversal attempt detected".to_string(),
            ));
        }

        Ok(canonical_path)
    }
}

impl FileSystem for FileSystemAdapter {
    async fn read_text(&self, root: &str, path: &str) -> FileSystemResult<String> {
        let full_path = Self::resolve(root, path).await?;

        let bytes = tokio::fs::read(&full_path)
            .await
            .map_err(FileSystemError::IoError)?;

        String::from_utf8(bytes).map_err(|e| {
            FileSystemError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}
