//! Error hierarchy for the PR workspace manager.
//!
//! Deletion refusals are modeled as dedicated variants so callers can tell a
//! safety stop apart from plain I/O failure.

use thiserror::Error;

/// Convenient alias for workspace results.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Root error type for the pr-workspace crate.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// PR numbers are 1-based on every hosting platform.
    #[error("invalid pr number: {0}")]
    InvalidPrNumber(i64),

    /// Base directory is empty or whitespace-only.
    #[error("work base dir is empty")]
    EmptyBaseDir,

    /// Base directory resolves to the filesystem root.
    #[error("work base dir cannot be filesystem root")]
    BaseDirIsRoot,

    /// Repo full name is not exactly `owner/repo` with usable segments.
    #[error("invalid repo full name {0:?}")]
    InvalidRepoName(String),

    /// Deletion target lacks the sentinel file.
    #[error("refusing to delete {dir}: missing sentinel {sentinel}")]
    MissingSentinel { dir: String, sentinel: &'static str },

    /// Deletion target is the base directory itself.
    #[error("refusing to delete base dir {0}")]
    TargetIsBaseDir(String),

    /// Deletion target resolves outside the base directory.
    #[error("refusing to delete {target}: outside base dir {base}")]
    OutsideBaseDir { target: String, base: String },

    /// Underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
