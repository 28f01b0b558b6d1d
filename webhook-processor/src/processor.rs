//! Event routing: webhooks in, workspace/scan/review actions out.
//!
//! Dispatch by event name:
//! - `ping` — no-op success.
//! - `pull_request` — opened/reopened/synchronize ensure the workspace,
//!   run the scan flow when a live `@scan` directive exists at the head
//!   ref, then review. `closed` deletes the workspace.
//! - `issue_comment` — a newly created comment on a PR containing
//!   `@prmate` triggers the scan flow at the PR's head branch.
//!
//! Scan failures are surfaced to the PR as a comment and never fail the
//! webhook job.

use std::sync::Arc;

use tracing::{debug, info, warn};

use pr_reviewer::hosting::HostClient;
use pr_reviewer::review::{ReviewRequest, ReviewService};
use pr_workspace::Manager;

use crate::errors::WebhookResult;
use crate::events::{self, IssueCommentEvent, PullRequestEvent, WebhookEvent};
use crate::scan::{ScanRequest, ScanService};

pub struct Processor {
    workspace: Arc<Manager>,
    scan: ScanService,
    review: ReviewService,
    host: HostClient,
}

impl Processor {
    pub fn new(
        workspace: Arc<Manager>,
        scan: ScanService,
        review: ReviewService,
        host: HostClient,
    ) -> Self {
        Self {
            workspace,
            scan,
            review,
            host,
        }
    }

    /// Processes one webhook delivery.
    pub async fn process(
        &self,
        event_type: &str,
        payload: &[u8],
        delivery_id: &str,
    ) -> WebhookResult<()> {
        debug!(event = event_type, delivery = delivery_id, "processing webhook");

        match events::parse_event(event_type, payload)? {
            WebhookEvent::Ping(_) => Ok(()),
            WebhookEvent::PullRequest(event) => self.handle_pull_request(event).await,
            WebhookEvent::IssueComment(event) => self.handle_issue_comment(event).await,
            WebhookEvent::Other => Ok(()),
        }
    }

    async fn handle_pull_request(&self, event: PullRequestEvent) -> WebhookResult<()> {
        let action = event.action.to_lowercase();
        let full_name = &event.repository.full_name;
        let pr_number = event.pull_request.number;
        let (owner, repo) = events::parse_repo_full_name(full_name)?;

        match action.as_str() {
            "opened" | "reopened" | "synchronize" => {
                self.workspace.ensure(full_name, pr_number as i64).await?;

                // A failing scan must not block the review.
                if let Err(err) = self
                    .check_and_process_scan(owner, repo, pr_number, &event.pull_request.head.branch)
                    .await
                {
                    warn!(%err, "scan processing failed");
                }

                let request = ReviewRequest {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    pr_number,
                    head_sha: event.pull_request.head.sha.clone(),
                    head_ref: event.pull_request.head.branch.clone(),
                    base_sha: event.pull_request.base.sha.clone(),
                };
                let result = self.review.review(&request).await?;
                info!(
                    pr = pr_number,
                    files = result.files_reviewed,
                    violations = result.violations_found,
                    "review finished"
                );
                Ok(())
            }
            "closed" => {
                self.workspace.delete(full_name, pr_number as i64).await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn handle_issue_comment(&self, event: IssueCommentEvent) -> WebhookResult<()> {
        // Only comments on pull requests, only on creation.
        if event.issue.pull_request.is_none() {
            return Ok(());
        }
        if event.action.to_lowercase() != "created" {
            return Ok(());
        }
        if !self.scan.has_prmate_directive(&event.comment.body) {
            return Ok(());
        }

        let (owner, repo) = events::parse_repo_full_name(&event.repository.full_name)?;
        let pr_number = event.issue.number;

        let branch = self.host.pr_head_branch(owner, repo, pr_number).await?;
        info!(owner, repo, pr = pr_number, "@prmate directive in comment");

        self.check_and_process_scan(owner, repo, pr_number, &branch)
            .await
    }

    async fn check_and_process_scan(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        branch: &str,
    ) -> WebhookResult<()> {
        let (has_scan, external_repos) = self
            .scan
            .check_for_scan_directive(owner, repo, branch)
            .await?;
        if !has_scan {
            return Ok(());
        }

        info!(owner, repo, pr = pr_number, ?external_repos, "@scan directive found");

        let request = ScanRequest {
            owner: owner.to_string(),
            repo: repo.to_string(),
            pr_number,
            branch: branch.to_string(),
            external_repos,
        };

        match self.scan.process_scan(&request).await {
            Ok(outcome) => {
                let _ = self
                    .host
                    .create_pr_comment(
                        owner,
                        repo,
                        pr_number,
                        "✅ PRMate scan completed. `.prmate.md` has been updated with codebase context.",
                    )
                    .await;
                info!(
                    pr = pr_number,
                    temp = %outcome.temp_file_path.display(),
                    "scan completed"
                );
                Ok(())
            }
            Err(err) => {
                let _ = self
                    .host
                    .create_pr_comment(
                        owner,
                        repo,
                        pr_number,
                        &format!("❌ PRMate scan failed: {err}"),
                    )
                    .await;
                Err(err)
            }
        }
    }
}
