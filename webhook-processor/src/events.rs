//! Webhook payload models.
//!
//! Only the fields the processor actually routes on are deserialized;
//! everything else in the hosting payload is ignored. Unknown event names
//! parse to [`WebhookEvent::Other`] and are a successful no-op.

use serde::Deserialize;

use crate::errors::{WebhookError, WebhookResult};

/// A parsed webhook event.
#[derive(Debug)]
pub enum WebhookEvent {
    Ping(PingEvent),
    PullRequest(PullRequestEvent),
    IssueComment(IssueCommentEvent),
    Other,
}

#[derive(Debug, Deserialize)]
pub struct PingEvent {
    #[serde(default)]
    pub zen: Option<String>,
    #[serde(default)]
    pub hook_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub repository: Repository,
    pub pull_request: PullRequestPayload,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    pub head: BranchRef,
    pub base: BranchRef,
}

#[derive(Debug, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub branch: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct IssueCommentEvent {
    pub action: String,
    pub issue: Issue,
    pub comment: Comment,
    pub repository: Repository,
}

#[derive(Debug, Deserialize)]
pub struct Issue {
    pub number: u64,
    /// Present iff the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub body: String,
}

/// Parses a raw payload according to the `X-GitHub-Event` header value.
pub fn parse_event(event_type: &str, payload: &[u8]) -> WebhookResult<WebhookEvent> {
    Ok(match event_type {
        "ping" => WebhookEvent::Ping(serde_json::from_slice(payload)?),
        "pull_request" => WebhookEvent::PullRequest(serde_json::from_slice(payload)?),
        "issue_comment" => WebhookEvent::IssueComment(serde_json::from_slice(payload)?),
        _ => WebhookEvent::Other,
    })
}

/// Splits "owner/repo" into parts.
pub fn parse_repo_full_name(full_name: &str) -> WebhookResult<(&str, &str)> {
    match full_name.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner, repo))
        }
        _ => Err(WebhookError::InvalidRepoName(full_name.to_string())),
    }
}
