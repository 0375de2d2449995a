//! Error types shared by genanno crates

use thiserror::Error;

/// Result type alias for shared genanno operations
pub type Result<T> = std::result::Result<T, AnnoError>;

/// Shared error type
#[derive(Error, Debug)]
pub enum AnnoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
