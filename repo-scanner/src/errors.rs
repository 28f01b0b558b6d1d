//! Error hierarchy for scanning, cloning, and analysis.

use thiserror::Error;

/// Convenient alias for scanner results.
pub type ScanResult<T> = Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid repo address: {0}")]
    InvalidRepoAddress(String),
}
