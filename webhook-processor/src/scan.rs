//! Scan orchestration: directive detection and rules-document refresh.
//!
//! The scan flow materializes the PR's repository with a shallow clone,
//! runs the multi-repo scan over it plus any externals named by the
//! `@scan` directive, renders the rules document, and records directive
//! consumption by carrying the comment block forward rewritten to
//! `@scanned`.

use std::path::PathBuf;

use tracing::{debug, info};

use pr_reviewer::hosting::HostClient;
use pr_reviewer::review::rules::RULES_DOCUMENT;
use pr_reviewer::HostError;
use repo_scanner::instructions;
use repo_scanner::{generator, MultiRepoScanner};

use crate::errors::WebhookResult;

/// Parameters for one scan run.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
    pub branch: String,
    pub external_repos: Vec<String>,
}

/// Outcome of a successful scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// The rendered rules document.
    pub rules_document: String,
    /// Kept temp file carrying the document.
    pub temp_file_path: PathBuf,
}

/// Detects scan directives and produces rules documents.
#[derive(Clone)]
pub struct ScanService {
    host: HostClient,
    github_token: String,
}

impl ScanService {
    pub fn new(host: HostClient, github_token: impl Into<String>) -> Self {
        Self {
            host,
            github_token: github_token.into(),
        }
    }

    /// Checks the rules document at `branch` for a live `@scan` directive.
    /// Returns the directive presence and any external repo references.
    /// A missing rules document simply means "no scan".
    pub async fn check_for_scan_directive(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> WebhookResult<(bool, Vec<String>)> {
        let content = match self
            .host
            .get_file_content(owner, repo, RULES_DOCUMENT, branch)
            .await
        {
            Ok(content) => content,
            Err(pr_reviewer::Error::Host(HostError::NotFound)) => {
                return Ok((false, Vec::new()));
            }
            Err(err) => return Err(err.into()),
        };

        if !instructions::has_scan_directive(&content) {
            return Ok((false, Vec::new()));
        }

        Ok((true, instructions::parse_scan_directive(&content)))
    }

    /// True when a comment body invokes PRMate.
    pub fn has_prmate_directive(&self, content: &str) -> bool {
        instructions::has_prmate_directive(content)
    }

    /// Runs the full scan: clone, multi-repo analysis, render, persist.
    pub async fn process_scan(&self, req: &ScanRequest) -> WebhookResult<ScanOutcome> {
        info!(
            owner = %req.owner,
            repo = %req.repo,
            pr = req.pr_number,
            externals = req.external_repos.len(),
            "starting scan"
        );

        let scanner = MultiRepoScanner::new(self.github_token.clone())?;

        let current_address = format!("github.com/{}/{}", req.owner, req.repo);
        let current_path = scanner
            .clone_repo(&current_address, Some(&req.branch))
            .await?;

        // The pre-scan document carries the directive block we must mark
        // as consumed.
        let previous_document =
            std::fs::read_to_string(current_path.join(RULES_DOCUMENT)).ok();

        let result = scanner
            .scan_with_externals(&current_path, &req.external_repos)
            .await?;

        let mut document = generator::generate(&result);
        if let Some(block) = previous_document.as_deref().and_then(consumed_directive_block) {
            document = format!("{block}\n\n{document}");
        }

        generator::write_to_repo(&document, &current_path)?;
        let temp_file_path = generator::write_to_temp(&document)?;

        debug!(temp = %temp_file_path.display(), "rules document written");
        Ok(ScanOutcome {
            rules_document: document,
            temp_file_path,
        })
    }
}

/// Extracts the HTML-comment block holding the `@scan` directive and
/// rewrites it to `@scanned`, recording consumption in the regenerated
/// document.
fn consumed_directive_block(content: &str) -> Option<String> {
    if !instructions::has_scan_directive(content) {
        return None;
    }

    let directive = content.find("@scan")?;
    let open = content[..directive].rfind("<!--")?;
    let close = directive + content[directive..].find("-->")? + "-->".len();

    Some(instructions::mark_scan_processed(&content[open..close]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_reviewer::hosting::memory::{MemoryHost, MemoryState};

    fn service(state: MemoryState) -> ScanService {
        ScanService::new(HostClient::in_memory(MemoryHost::new(state)), "")
    }

    #[tokio::test]
    async fn missing_rules_document_means_no_scan() {
        let svc = service(MemoryState::default());
        let (has_scan, repos) = svc
            .check_for_scan_directive("octo", "widgets", "main")
            .await
            .unwrap();
        assert!(!has_scan);
        assert!(repos.is_empty());
    }

    #[tokio::test]
    async fn live_directive_is_detected_with_repos() {
        let mut state = MemoryState::default();
        state.file_contents.insert(
            ".prmate.md".into(),
            "# Context\n<!-- PRMate\n@scan\nowner/other\n-->\n".into(),
        );
        let svc = service(state);

        let (has_scan, repos) = svc
            .check_for_scan_directive("octo", "widgets", "main")
            .await
            .unwrap();
        assert!(has_scan);
        assert_eq!(repos, vec!["owner/other".to_string()]);
    }

    #[tokio::test]
    async fn consumed_directive_is_not_a_scan() {
        let mut state = MemoryState::default();
        state.file_contents.insert(
            ".prmate.md".into(),
            "# Context\n<!-- PRMate\n@scanned\nowner/other\n-->\n".into(),
        );
        let svc = service(state);

        let (has_scan, _) = svc
            .check_for_scan_directive("octo", "widgets", "main")
            .await
            .unwrap();
        assert!(!has_scan);
    }

    #[test]
    fn directive_block_rewritten_on_consumption() {
        let content = "# Title\n<!-- PRMate\n@scan\nowner/repo\n-->\nbody";
        let block = consumed_directive_block(content).unwrap();
        assert_eq!(block, "<!-- PRMate\n@scanned\nowner/repo\n-->");

        assert!(consumed_directive_block("no markers").is_none());
        assert!(consumed_directive_block("<!-- @scanned -->").is_none());
    }
}
