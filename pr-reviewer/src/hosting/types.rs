//! Hosting-agnostic types shared by the client facade and the review engine.

use serde::Serialize;

/// Pull-request metadata (the subset the pipeline needs).
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub head_ref: String,
    pub head_sha: String,
    pub base_ref: String,
    pub base_sha: String,
}

/// A file changed in a PR.
#[derive(Debug, Clone, Default)]
pub struct PrFile {
    pub filename: String,
    /// `added`, `removed`, `modified`, or `renamed`.
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    /// Unified diff; empty for binary or oversized files.
    pub patch: String,
}

/// An existing inline review comment.
#[derive(Debug, Clone)]
pub struct ReviewComment {
    pub path: String,
    pub line: Option<u32>,
    pub body: String,
}

/// An inline comment attached to a review being created.
///
/// Serialized directly into the hosting API request body.
#[derive(Debug, Clone, Serialize)]
pub struct DraftReviewComment {
    pub path: String,
    /// 1-based line number in the new file; must be present in the patch.
    pub line: u32,
    /// Always `RIGHT` — we only anchor on the new side.
    pub side: &'static str,
    pub body: String,
}

/// A review posted in one shot: body, verdict event, inline comments.
#[derive(Debug, Clone)]
pub struct PostedReview {
    pub commit_id: String,
    pub event: String,
    pub body: String,
    pub comments: Vec<DraftReviewComment>,
}
