//! GitHub provider (REST v3) for PR metadata, files, content, and reviews.
//!
//! Endpoints used:
//! - GET  /repos/{owner}/{repo}/pulls/{number}
//! - GET  /repos/{owner}/{repo}/pulls/{number}/files   (field "patch" is unified diff)
//! - GET  /repos/{owner}/{repo}/contents/{path}?ref=   (base64 payload)
//! - GET  /repos/{owner}/{repo}/issues/{number}/comments
//! - GET  /repos/{owner}/{repo}/pulls/{number}/comments
//! - POST /repos/{owner}/{repo}/issues/{number}/comments
//! - POST /repos/{owner}/{repo}/pulls/{number}/reviews

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{HostError, MrResult};
use crate::hosting::types::*;

const PER_PAGE: usize = 100;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String, // "https://api.github.com"
    token: String,
}

impl GitHubClient {
    /// Constructs a GitHub client with a shared reqwest instance and auth token.
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self {
            http,
            base_api: base_api.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Token-authenticated HTTPS clone URL for the given repository.
    pub fn clone_url(&self, owner: &str, repo: &str) -> String {
        format!("https://{}@github.com/{}/{}.git", self.token, owner, repo)
    }

    /// Fetches PR metadata including head/base refs and SHAs.
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MrResult<PullRequest> {
        let url = format!("{}/repos/{}/{}/pulls/{}", self.base_api, owner, repo, number);
        let resp: GitHubPull = self
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(PullRequest {
            number: resp.number,
            title: resp.title.unwrap_or_default(),
            state: resp.state,
            head_ref: resp.head.git_ref,
            head_sha: resp.head.sha,
            base_ref: resp.base.git_ref,
            base_sha: resp.base.sha,
        })
    }

    /// Fetches all files changed in a PR, following pagination.
    pub async fn list_pr_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MrResult<Vec<PrFile>> {
        let mut all = Vec::new();
        let mut page = 1usize;

        loop {
            let url = format!(
                "{}/repos/{}/{}/pulls/{}/files?per_page={}&page={}",
                self.base_api, owner, repo, number, PER_PAGE, page
            );
            let batch: Vec<GitHubPrFile> = self
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let batch_len = batch.len();
            all.extend(batch.into_iter().map(|f| PrFile {
                filename: f.filename,
                status: f.status,
                additions: f.additions,
                deletions: f.deletions,
                patch: f.patch.unwrap_or_default(),
            }));

            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    /// Fetches file content at a ref via the contents API (base64 decoded).
    pub async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> MrResult<String> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.base_api, owner, repo, path, git_ref
        );
        let resp: GitHubContent = self
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let encoded = resp
            .content
            .ok_or_else(|| HostError::InvalidResponse(format!("no content for {path}")))?;
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(compact)
            .map_err(|e| HostError::InvalidResponse(format!("base64 decode {path}: {e}")))?;

        String::from_utf8(bytes)
            .map_err(|e| HostError::InvalidResponse(format!("non-utf8 content {path}: {e}")).into())
    }

    /// Lists PR-level (issue) comment bodies, oldest first.
    pub async fn list_pr_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MrResult<Vec<String>> {
        let mut all = Vec::new();
        let mut page = 1usize;

        loop {
            let url = format!(
                "{}/repos/{}/{}/issues/{}/comments?per_page={}&page={}",
                self.base_api, owner, repo, number, PER_PAGE, page
            );
            let batch: Vec<GitHubIssueComment> = self
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let batch_len = batch.len();
            all.extend(batch.into_iter().filter_map(|c| c.body));

            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    /// Lists existing inline review comments.
    pub async fn list_review_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MrResult<Vec<ReviewComment>> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/comments?per_page={}",
            self.base_api, owner, repo, number, PER_PAGE
        );
        let raw: Vec<GitHubReviewComment> = self
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(raw
            .into_iter()
            .map(|c| ReviewComment {
                path: c.path,
                line: c.line,
                body: c.body,
            })
            .collect())
    }

    /// Creates a PR-level comment.
    pub async fn create_pr_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> MrResult<()> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.base_api, owner, repo, number
        );
        self.post(&url)
            .json(&CreateCommentRequest { body })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Creates a review with inline comments in a single request.
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
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/reviews",
            self.base_api, owner, repo, number
        );
        self.post(&url)
            .json(&CreateReviewRequest {
                commit_id,
                body,
                event,
                comments,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
    }
}

/// --- GitHub response shapes (subset of fields we actually use) ---

#[derive(Debug, Deserialize)]
struct GitHubPull {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    state: String,
    head: GitHubRef,
    base: GitHubRef,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubPrFile {
    filename: String,
    status: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    patch: Option<String>, // unified diff; None for binary/too large
}

#[derive(Debug, Deserialize)]
struct GitHubContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubIssueComment {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubReviewComment {
    path: String,
    #[serde(default)]
    line: Option<u32>,
    body: String,
}

#[derive(Debug, Serialize)]
struct CreateCommentRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateReviewRequest<'a> {
    commit_id: &'a str,
    body: &'a str,
    event: &'a str,
    comments: &'a [DraftReviewComment],
}
