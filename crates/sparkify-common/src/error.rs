//! Error types shared across the Sparkify workspace

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Error type for shared utilities
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to walk {}: {message}", path.display())]
    Walk { path: PathBuf, message: String },
}

impl From<walkdir::Error> for CommonError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        CommonError::Walk {
            path,
            message: err.to_string(),
        }
    }
}
