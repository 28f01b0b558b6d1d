//! Hosting facade w/o async-trait or dynamic trait objects.
//!
//! We expose an enum [`HostClient`] with concrete implementations per
//! backend: the GitHub REST client and an in-memory double. This keeps
//! async fns simple and avoids boxing futures; tests substitute
//! [`memory::MemoryHost`] without any trait plumbing.

pub mod github;
pub mod memory;
pub mod types;

pub use types::*;

use crate::errors::MrResult;

/// Runtime configuration for the hosting client.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// API base, e.g. "https://api.github.com".
    pub base_api: String,
    /// Access token (PAT or app token).
    pub token: String,
}

/// Concrete hosting client (enum-dispatch).
#[derive(Debug, Clone)]
pub enum HostClient {
    GitHub(github::GitHubClient),
    Memory(memory::MemoryHost),
}

impl HostClient {
    /// Constructs the GitHub-backed client from generic config.
    pub fn from_config(cfg: HostConfig) -> MrResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("prmate/0.1")
            .build()?;
        Ok(Self::GitHub(github::GitHubClient::new(
            client,
            cfg.base_api,
            cfg.token,
        )))
    }

    /// Wraps an in-memory double (tests, dry runs).
    pub fn in_memory(host: memory::MemoryHost) -> Self {
        Self::Memory(host)
    }

    /// Fetch PR metadata (head/base refs and SHAs).
    pub async fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> MrResult<PullRequest> {
        match self {
            Self::GitHub(c) => c.get_pull_request(owner, repo, number).await,
            Self::Memory(c) => c.get_pull_request(owner, repo, number),
        }
    }

    /// Convenience: the PR's head branch name.
    pub async fn pr_head_branch(&self, owner: &str, repo: &str, number: u64) -> MrResult<String> {
        Ok(self.get_pull_request(owner, repo, number).await?.head_ref)
    }

    /// Fetch the changed-file list with per-file unified diffs.
    pub async fn list_pr_files(&self, owner: &str, repo: &str, number: u64) -> MrResult<Vec<PrFile>> {
        match self {
            Self::GitHub(c) => c.list_pr_files(owner, repo, number).await,
            Self::Memory(c) => c.list_pr_files(owner, repo, number),
        }
    }

    /// Fetch a file's content at a specific git ref.
    pub async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> MrResult<String> {
        match self {
            Self::GitHub(c) => c.get_file_content(owner, repo, path, git_ref).await,
            Self::Memory(c) => c.get_file_content(owner, repo, path, git_ref),
        }
    }

    /// List PR-level comment bodies, oldest first.
    pub async fn list_pr_comments(&self, owner: &str, repo: &str, number: u64) -> MrResult<Vec<String>> {
        match self {
            Self::GitHub(c) => c.list_pr_comments(owner, repo, number).await,
            Self::Memory(c) => c.list_pr_comments(owner, repo, number),
        }
    }

    /// List existing inline review comments.
    pub async fn list_review_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MrResult<Vec<ReviewComment>> {
        match self {
            Self::GitHub(c) => c.list_review_comments(owner, repo, number).await,
            Self::Memory(c) => c.list_review_comments(owner, repo, number),
        }
    }

    /// Post a PR-level comment.
    pub async fn create_pr_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> MrResult<()> {
        match self {
            Self::GitHub(c) => c.create_pr_comment(owner, repo, number, body).await,
            Self::Memory(c) => c.create_pr_comment(owner, repo, number, body),
        }
    }

    /// Post a review with inline comments in one request.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        commit_id: &str,
        event: &str,
        body: &str,
        comments: &[DraftReviewComment],
    ) -> MrResult<()> {
        match self {
            Self::GitHub(c) => {
                c.create_review(owner, repo, number, commit_id, event, body, comments)
                    .await
            }
            Self::Memory(c) => c.create_review(owner, repo, number, commit_id, event, body, comments),
        }
    }

    /// Token-authenticated HTTPS clone URL (GitHub only; the memory double
    /// has nothing to clone).
    pub fn clone_url(&self, owner: &str, repo: &str) -> Option<String> {
        match self {
            Self::GitHub(c) => Some(c.clone_url(owner, repo)),
            Self::Memory(_) => None,
        }
    }
}
