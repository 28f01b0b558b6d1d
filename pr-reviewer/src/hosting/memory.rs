//! In-memory hosting double.
//!
//! Backs the same capability set as the real client from plain maps and
//! vectors so tests (and dry runs) can observe exactly what would have been
//! posted. Shared state sits behind an `Arc<Mutex<_>>`, so clones of one
//! [`MemoryHost`] observe each other's writes, like clones of a real client
//! hitting the same server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{HostError, MrResult};
use crate::hosting::types::*;

#[derive(Debug, Default)]
pub struct MemoryState {
    pub pull_request: Option<PullRequest>,
    pub pr_files: Vec<PrFile>,
    /// path -> content at the (single) simulated ref.
    pub file_contents: HashMap<String, String>,
    pub pr_comments: Vec<String>,
    pub review_comments: Vec<ReviewComment>,
    /// Reviews posted through this double, in order.
    pub posted_reviews: Vec<PostedReview>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHost {
    pub fn new(state: MemoryState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Direct access to the shared state for test setup and assertions.
    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get_pull_request(&self, _owner: &str, _repo: &str, _number: u64) -> MrResult<PullRequest> {
        self.state()
            .pull_request
            .clone()
            .ok_or_else(|| HostError::NotFound.into())
    }

    pub fn list_pr_files(&self, _owner: &str, _repo: &str, _number: u64) -> MrResult<Vec<PrFile>> {
        Ok(self.state().pr_files.clone())
    }

    pub fn get_file_content(&self, _owner: &str, _repo: &str, path: &str, _git_ref: &str) -> MrResult<String> {
        self.state()
            .file_contents
            .get(path)
            .cloned()
            .ok_or_else(|| HostError::NotFound.into())
    }

    pub fn list_pr_comments(&self, _owner: &str, _repo: &str, _number: u64) -> MrResult<Vec<String>> {
        Ok(self.state().pr_comments.clone())
    }

    pub fn list_review_comments(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> MrResult<Vec<ReviewComment>> {
        Ok(self.state().review_comments.clone())
    }

    pub fn create_pr_comment(&self, _owner: &str, _repo: &str, _number: u64, body: &str) -> MrResult<()> {
        self.state().pr_comments.push(body.to_string());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_review(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
        commit_id: &str,
        event: &str,
        body: &str,
        comments: &[DraftReviewComment],
    ) -> MrResult<()> {
        self.state().posted_reviews.push(PostedReview {
            commit_id: commit_id.to_string(),
            event: event.to_string(),
            body: body.to_string(),
            comments: comments.to_vec(),
        });
        Ok(())
    }
}
