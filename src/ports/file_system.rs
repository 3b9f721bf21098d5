use thiserror::Error;

/// Error type for file system operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileSystemError {
    /// The requested file does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when path is invalid
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for file system operations
pub type FileSystemResult<T> = Result<T, FileSystemError>;

/// FileSystem defines the port (interface) for reading static admin assets
pub trait FileSystem: Send + Sync + 'static {
    /// Read a UTF-8 text file located under `root`.
    ///
    /// # Arguments
    /// * `root` - The directory assets are served from
    /// * `path` - The path to the file relative to the root
    ///
    /// # Returns
    /// The file contents, [`FileSystemError::NotFound`] when it is missing,
    /// or another error when it exists but cannot be read or decoded
    fn read_text(
        &self,
        root: &str,
        path: &str,
    ) -> impl std::future::Future<Output = FileSystemResult<String>> + Send;
}
