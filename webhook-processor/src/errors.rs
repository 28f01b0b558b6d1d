//! Error hierarchy for webhook processing and dispatch.

use thiserror::Error;

/// Convenient alias for processor results.
pub type WebhookResult<T> = Result<T, WebhookError>;

#[derive(Debug, Error)]
pub enum WebhookError {
    /// Bounded queue is at capacity; the caller should answer 503.
    #[error("webhook queue full")]
    QueueFull,

    /// Dispatcher exists but its workers are gone.
    #[error("webhook workers stopped")]
    Stopped,

    /// Stop deadline elapsed before workers drained.
    #[error("stop webhook workers: deadline exceeded")]
    StopDeadline,

    /// Payload did not parse as the declared event type.
    #[error("parse webhook event: {0}")]
    Payload(#[from] serde_json::Error),

    /// Repository full name is not `owner/repo`.
    #[error("invalid repo full name {0:?}")]
    InvalidRepoName(String),

    #[error(transparent)]
    Workspace(#[from] pr_workspace::errors::WorkspaceError),

    #[error(transparent)]
    Review(#[from] pr_reviewer::Error),

    #[error(transparent)]
    Scan(#[from] repo_scanner::ScanError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
