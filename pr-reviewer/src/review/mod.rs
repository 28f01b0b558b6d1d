//! Rule-driven PR review engine.
//!
//! Single high-level entry: [`ReviewService::review`]. For one pull request
//! it runs:
//!
//! 1) **Step A — Load rules**: fetch `.prmate.md` at the head ref, route
//!    sections into rules / checklist / codebase info. No rules → empty
//!    result, nothing posted.
//! 2) **Step B — Prior summary**: newest summary comment wins; a broken one
//!    degrades to "review everything".
//! 3) **Step C — File filtering**: skip files already reviewed at this SHA
//!    with an empty patch; `removed` files are never analyzed.
//! 4) **Step D — Per-file analysis**: full content (small files) +
//!    dependency hints + diff → prompt → LLM → validated violations.
//! 5) **Step E — Inline review**: one review, anchors on added lines only,
//!    `REQUEST_CHANGES` iff any violation is an error.
//! 6) **Step F — Summary comment**: marker-bracketed state blob for the
//!    next incremental run.
//!
//! Transient failures (hosting, LLM, single-file analysis) are logged and
//! skipped; the review keeps going. Only rules loading and the changed-file
//! listing are load-bearing.

pub mod deps;
pub mod prompt;
pub mod rules;
pub mod summary;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ai_llm_service::TextGenerator;

use crate::errors::MrResult;
use crate::hosting::{DraftReviewComment, HostClient, PrFile};
use crate::parser;
use crate::review::rules::LoadedRules;

pub use summary::SUMMARY_VERSION;

/// Parameters identifying the PR and commit under review.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
    pub head_sha: String,
    pub head_ref: String,
    pub base_sha: String,
}

/// Outcome counters for one review run.
#[derive(Debug, Clone, Default)]
pub struct ReviewResult {
    pub files_reviewed: usize,
    pub comments_posted: usize,
    pub violations_found: usize,
    pub summary_posted: bool,
    pub reviewed_commit: String,
}

/// Violation severity. Unknown strings from the model degrade to `Warning`
/// instead of poisoning the whole response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Severity::Error => "❌",
            Severity::Warning => "⚠️",
            Severity::Suggestion => "💡",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.to_ascii_lowercase().as_str() {
            "error" => Severity::Error,
            "suggestion" => Severity::Suggestion,
            _ => Severity::Warning,
        })
    }
}

/// A rule violation anchored to a new-file line.
#[derive(Debug, Clone)]
pub struct FileViolation {
    pub path: String,
    /// 1-based line number in the new file.
    pub line: u32,
    pub rule: String,
    pub message: String,
    pub severity: Severity,
    /// Optional suggested fix from the model.
    pub code_snippet: Option<String>,
}

/// Per-file review state carried inside the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReviewStatus {
    pub path: String,
    pub last_sha: String,
    pub violations: usize,
    /// RFC3339 timestamp.
    pub reviewed_at: String,
}

/// The tracking blob persisted inside a PR comment (schema `"1.0"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub version: String,
    pub last_reviewed_at: DateTime<Utc>,
    pub head_sha: String,
    pub files_scanned: Vec<FileReviewStatus>,
    pub rules_applied: usize,
    pub violations_found: usize,
}

/// Performs PR reviews based on `.prmate.md` rules.
pub struct ReviewService {
    host: HostClient,
    generator: Arc<TextGenerator>,
}

impl ReviewService {
    pub fn new(host: HostClient, generator: Arc<TextGenerator>) -> Self {
        Self { host, generator }
    }

    /// Runs a complete review of one pull request.
    pub async fn review(&self, req: &ReviewRequest) -> MrResult<ReviewResult> {
        info!(
            owner = %req.owner,
            repo = %req.repo,
            pr = req.pr_number,
            commit = short_sha(&req.head_sha),
            "starting review"
        );

        // Step A: rules.
        let loaded = rules::load_rules(&self.host, req).await?;
        if loaded.rules.is_empty() && loaded.checklist.is_empty() {
            debug!("no rules found in rules document, skipping review");
            return Ok(ReviewResult {
                reviewed_commit: req.head_sha.clone(),
                ..Default::default()
            });
        }
        debug!(
            rules = loaded.rules.len(),
            checklist = loaded.checklist.len(),
            "rules loaded"
        );

        // Step B: prior summary (non-fatal).
        let previous = match summary::load_previous(&self.host, req).await {
            Ok(prev) => prev,
            Err(err) => {
                warn!(%err, "could not read previous summary");
                None
            }
        };

        // Step C: changed files, filtered against the prior summary.
        let files = self
            .host
            .list_pr_files(&req.owner, &req.repo, req.pr_number)
            .await?;
        let total = files.len();
        let to_review = filter_files_to_review(files, previous.as_ref(), &req.head_sha);
        debug!(reviewing = to_review.len(), total, "file set filtered");

        // Step D: per-file analysis.
        let mut all_violations: Vec<FileViolation> = Vec::new();
        let mut file_statuses: Vec<FileReviewStatus> = Vec::with_capacity(to_review.len());

        for file in &to_review {
            if file.status == "removed" {
                continue;
            }

            let violations = match self.analyze_file(req, file, &loaded).await {
                Ok(v) => v,
                Err(err) => {
                    warn!(file = %file.filename, %err, "analysis failed, skipping file");
                    continue;
                }
            };

            file_statuses.push(FileReviewStatus {
                path: file.filename.clone(),
                last_sha: req.head_sha.clone(),
                violations: violations.len(),
                reviewed_at: Utc::now().to_rfc3339(),
            });
            all_violations.extend(violations);
        }

        // Step E: inline review.
        let mut comments_posted = 0;
        if !all_violations.is_empty() {
            match self.post_review_comments(req, &all_violations).await {
                Ok(posted) => comments_posted = posted,
                Err(err) => warn!(%err, "failed to post review comments"),
            }
        }

        // Step F: summary comment.
        let review_summary = ReviewSummary {
            version: SUMMARY_VERSION.to_string(),
            last_reviewed_at: Utc::now(),
            head_sha: req.head_sha.clone(),
            files_scanned: file_statuses,
            rules_applied: loaded.rules.len() + loaded.checklist.len(),
            violations_found: all_violations.len(),
        };
        let summary_posted = match summary::post(&self.host, req, &review_summary).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to post summary");
                false
            }
        };

        Ok(ReviewResult {
            files_reviewed: to_review.len(),
            comments_posted,
            violations_found: all_violations.len(),
            summary_posted,
            reviewed_commit: req.head_sha.clone(),
        })
    }

    /// Step D for a single file: content + dependency hints + diff → LLM →
    /// validated violations.
    async fn analyze_file(
        &self,
        req: &ReviewRequest,
        file: &PrFile,
        loaded: &LoadedRules,
    ) -> MrResult<Vec<FileViolation>> {
        // Full content only for reasonably-sized changes.
        let mut file_content = String::new();
        if file.additions + file.deletions < 500 {
            match self
                .host
                .get_file_content(&req.owner, &req.repo, &file.filename, &req.head_ref)
                .await
            {
                Ok(content) => file_content = content,
                Err(err) => debug!(file = %file.filename, %err, "full content unavailable"),
            }
        }

        let dependency_context =
            deps::gather_dependency_context(&self.host, req, &file.filename, &file_content).await;

        let analysis_prompt = prompt::build_analysis_prompt(
            &file.filename,
            &file_content,
            &file.patch,
            loaded,
            &dependency_context,
        );

        let response = self.generator.generate(&analysis_prompt).await?;
        Ok(parse_llm_response(&response, &file.filename, &file.patch))
    }

    /// Step E: one review with inline comments per violation.
    async fn post_review_comments(
        &self,
        req: &ReviewRequest,
        violations: &[FileViolation],
    ) -> MrResult<usize> {
        let comments: Vec<DraftReviewComment> = violations
            .iter()
            .map(|v| DraftReviewComment {
                path: v.path.clone(),
                line: v.line,
                side: "RIGHT",
                body: format!("{} **{}**: {}", v.severity.emoji(), v.rule, v.message),
            })
            .collect();

        let event = if violations.iter().any(|v| v.severity == Severity::Error) {
            "REQUEST_CHANGES"
        } else {
            "COMMENT"
        };

        let body = format!(
            "🔍 **PRMate Review** - Found {} issue(s) to address.",
            violations.len()
        );

        self.host
            .create_review(
                &req.owner,
                &req.repo,
                req.pr_number,
                &req.head_sha,
                event,
                &body,
                &comments,
            )
            .await?;

        Ok(comments.len())
    }
}

/// Step C: a file is reviewed when it was never reviewed, its recorded SHA
/// differs from the current head, or its patch is non-empty.
fn filter_files_to_review(
    files: Vec<PrFile>,
    previous: Option<&ReviewSummary>,
    current_sha: &str,
) -> Vec<PrFile> {
    let Some(previous) = previous else {
        return files;
    };

    let reviewed: HashMap<&str, &str> = previous
        .files_scanned
        .iter()
        .map(|f| (f.path.as_str(), f.last_sha.as_str()))
        .collect();

    files
        .into_iter()
        .filter(|file| match reviewed.get(file.filename.as_str()) {
            None => true,
            Some(last_sha) => *last_sha != current_sha || !file.patch.is_empty(),
        })
        .collect()
}

/// Step D5: trim fences, parse the JSON, drop anchors outside the diff.
///
/// When the patch yields no added lines at all (e.g. the patch is absent),
/// violations are kept as-is.
fn parse_llm_response(response: &str, file_path: &str, patch: &str) -> Vec<FileViolation> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let parsed: LlmAnalysisResponse = match serde_json::from_str(cleaned) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(file = file_path, %err, "failed to parse LLM response");
            return Vec::new();
        }
    };

    let valid_lines: std::collections::HashSet<u32> =
        parser::added_line_numbers(patch).into_iter().collect();

    parsed
        .violations
        .into_iter()
        .filter(|v| valid_lines.is_empty() || valid_lines.contains(&v.line))
        .map(|v| FileViolation {
            path: file_path.to_string(),
            line: v.line,
            rule: v.rule,
            message: v.message,
            severity: v.severity,
            code_snippet: v.fix,
        })
        .collect()
}

pub(crate) fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// --- LLM response shapes ---

#[derive(Debug, Deserialize)]
struct LlmAnalysisResponse {
    #[serde(default)]
    violations: Vec<LlmViolation>,
}

#[derive(Debug, Deserialize)]
struct LlmViolation {
    line: u32,
    rule: String,
    message: String,
    severity: Severity,
    #[serde(default)]
    fix: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosting::memory::{MemoryHost, MemoryState};
    use ai_llm_service::services::scripted_service::ScriptedService;

    const RULES_DOC: &str =
        "## Learned Rules\n- Wrap errors with fmt.Errorf and %w\n";

    fn request() -> ReviewRequest {
        ReviewRequest {
            owner: "octo".into(),
            repo: "widgets".into(),
            pr_number: 7,
            head_sha: "def4567890abc".into(),
            head_ref: "feature".into(),
            base_sha: "abc1234567890".into(),
        }
    }

    fn service(state: MemoryState, llm_response: &str) -> (ReviewService, MemoryHost) {
        let memory = MemoryHost::new(state);
        let host = HostClient::in_memory(memory.clone());
        let generator = Arc::new(TextGenerator::scripted(ScriptedService::single(
            llm_response,
        )));
        (ReviewService::new(host, generator), memory)
    }

    fn changed_file(name: &str, patch: &str) -> PrFile {
        PrFile {
            filename: name.into(),
            status: "modified".into(),
            additions: 1,
            deletions: 0,
            patch: patch.into(),
        }
    }

    #[tokio::test]
    async fn no_rules_means_empty_result() {
        let mut state = MemoryState::default();
        state.file_contents.insert(
            ".prmate.md".into(),
            "# PRMate Context\n\nNothing actionable.\n".into(),
        );
        state.pr_files.push(changed_file("main.go", "@@ -1 +1,2 @@\n line\n+x := 1"));

        let (svc, memory) = service(state, r#"{"violations":[]}"#);
        let result = svc.review(&request()).await.unwrap();

        assert_eq!(result.files_reviewed, 0);
        assert_eq!(result.violations_found, 0);
        assert_eq!(result.comments_posted, 0);
        assert!(!result.summary_posted);
        assert!(memory.state().posted_reviews.is_empty());
        assert!(memory.state().pr_comments.is_empty());
    }

    #[tokio::test]
    async fn single_rule_single_violation_posts_review_and_summary() {
        let mut state = MemoryState::default();
        state.file_contents.insert(".prmate.md".into(), RULES_DOC.into());
        state
            .file_contents
            .insert("handler.go".into(), "package main\n\nfunc do() error {\n\treturn err\n}\n".into());
        state
            .pr_files
            .push(changed_file("handler.go", "@@ -3,0 +4 @@\n+\treturn err"));

        let llm = r#"{"violations":[{"line":4,"rule":"Error Handling","message":"Error not wrapped","severity":"warning"}]}"#;
        let (svc, memory) = service(state, llm);
        let result = svc.review(&request()).await.unwrap();

        assert_eq!(result.files_reviewed, 1);
        assert_eq!(result.violations_found, 1);
        assert_eq!(result.comments_posted, 1);
        assert!(result.summary_posted);

        let state = memory.state();
        assert_eq!(state.posted_reviews.len(), 1);
        let review = &state.posted_reviews[0];
        assert_eq!(review.event, "COMMENT");
        assert_eq!(review.commit_id, "def4567890abc");
        assert_eq!(review.comments.len(), 1);
        assert_eq!(review.comments[0].line, 4);
        assert_eq!(review.comments[0].side, "RIGHT");
        assert!(review.comments[0].body.starts_with("⚠️ **Error Handling**:"));

        assert_eq!(state.pr_comments.len(), 1);
        let summary_comment = &state.pr_comments[0];
        assert!(summary_comment.starts_with("<!-- prmate-review-summary:def4567890abc -->"));
        assert!(summary_comment.contains("\"violations_found\":1"));
    }

    #[tokio::test]
    async fn error_severity_requests_changes() {
        let mut state = MemoryState::default();
        state.file_contents.insert(".prmate.md".into(), RULES_DOC.into());
        state
            .pr_files
            .push(changed_file("handler.go", "@@ -3,0 +4 @@\n+\treturn err"));

        let llm = r#"{"violations":[{"line":4,"rule":"Error Handling","message":"Broken","severity":"error"}]}"#;
        let (svc, memory) = service(state, llm);
        svc.review(&request()).await.unwrap();

        let state = memory.state();
        assert_eq!(state.posted_reviews[0].event, "REQUEST_CHANGES");
        assert!(state.posted_reviews[0].comments[0].body.starts_with("❌"));
    }

    #[tokio::test]
    async fn violation_outside_diff_is_dropped() {
        let mut state = MemoryState::default();
        state.file_contents.insert(".prmate.md".into(), RULES_DOC.into());
        state
            .pr_files
            .push(changed_file("handler.go", "@@ -3,0 +4 @@\n+\treturn err"));

        let llm = r#"{"violations":[{"line":99,"rule":"Error Handling","message":"nope","severity":"warning"}]}"#;
        let (svc, memory) = service(state, llm);
        let result = svc.review(&request()).await.unwrap();

        assert_eq!(result.violations_found, 0);
        assert!(memory.state().posted_reviews.is_empty());
        // Summary still records the clean pass.
        assert!(result.summary_posted);
    }

    #[tokio::test]
    async fn empty_patch_keeps_model_anchors() {
        let mut state = MemoryState::default();
        state.file_contents.insert(".prmate.md".into(), RULES_DOC.into());
        state.pr_files.push(changed_file("handler.go", ""));

        let llm = r#"{"violations":[{"line":10,"rule":"Error Handling","message":"kept","severity":"suggestion"}]}"#;
        let (svc, memory) = service(state, llm);
        let result = svc.review(&request()).await.unwrap();

        assert_eq!(result.violations_found, 1);
        assert!(memory.state().posted_reviews[0].comments[0]
            .body
            .starts_with("💡"));
    }

    #[tokio::test]
    async fn removed_files_are_never_analyzed() {
        let mut state = MemoryState::default();
        state.file_contents.insert(".prmate.md".into(), RULES_DOC.into());
        let mut gone = changed_file("old.go", "@@ -1,3 +0,0 @@\n-a\n-b\n-c");
        gone.status = "removed".into();
        state.pr_files.push(gone);

        let llm = r#"{"violations":[{"line":1,"rule":"R","message":"m","severity":"warning"}]}"#;
        let (svc, memory) = service(state, llm);
        let result = svc.review(&request()).await.unwrap();

        assert_eq!(result.violations_found, 0);
        assert!(memory.state().posted_reviews.is_empty());
    }

    #[tokio::test]
    async fn newest_summary_wins_for_incremental_filtering() {
        let old_summary = ReviewSummary {
            version: SUMMARY_VERSION.into(),
            last_reviewed_at: Utc::now(),
            head_sha: "abc123".into(),
            files_scanned: vec![FileReviewStatus {
                path: "main.go".into(),
                last_sha: "abc123".into(),
                violations: 0,
                reviewed_at: Utc::now().to_rfc3339(),
            }],
            rules_applied: 1,
            violations_found: 0,
        };
        let comment = summary::render_summary_comment("abc123", &old_summary).unwrap();

        let mut state = MemoryState::default();
        state.file_contents.insert(".prmate.md".into(), RULES_DOC.into());
        state.pr_comments.push("unrelated chatter".into());
        state.pr_comments.push(comment);
        // Same file returns with a fresh patch at a new head SHA.
        state
            .pr_files
            .push(changed_file("main.go", "@@ -1,0 +2 @@\n+changed"));

        let llm = r#"{"violations":[]}"#;
        let (svc, memory) = service(state, llm);
        let result = svc.review(&request()).await.unwrap();

        assert_eq!(result.files_reviewed, 1);
        // A second summary is appended; the next run will pick it up last.
        let state = memory.state();
        let summaries: Vec<_> = state
            .pr_comments
            .iter()
            .filter(|c| c.contains(summary::SUMMARY_MARKER_PREFIX))
            .collect();
        assert_eq!(summaries.len(), 2);
        let latest = summary::parse_summary_comment(summaries.last().unwrap()).unwrap();
        assert_eq!(latest.head_sha, "def4567890abc");
    }

    #[test]
    fn filter_skips_unchanged_reviewed_files() {
        let previous = ReviewSummary {
            version: SUMMARY_VERSION.into(),
            last_reviewed_at: Utc::now(),
            head_sha: "sha1".into(),
            files_scanned: vec![FileReviewStatus {
                path: "a.go".into(),
                last_sha: "sha1".into(),
                violations: 0,
                reviewed_at: Utc::now().to_rfc3339(),
            }],
            rules_applied: 1,
            violations_found: 0,
        };

        let files = vec![
            PrFile {
                filename: "a.go".into(),
                status: "modified".into(),
                patch: String::new(),
                ..Default::default()
            },
            PrFile {
                filename: "b.go".into(),
                status: "added".into(),
                patch: String::new(),
                ..Default::default()
            },
        ];

        // Same SHA, empty patch → a.go skipped; b.go never reviewed → kept.
        let kept = filter_files_to_review(files.clone(), Some(&previous), "sha1");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].filename, "b.go");

        // Different SHA → everything back in scope.
        let kept = filter_files_to_review(files, Some(&previous), "sha2");
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn llm_response_fences_are_trimmed() {
        let wrapped = "```json\n{\"violations\":[{\"line\":4,\"rule\":\"R\",\"message\":\"m\",\"severity\":\"warning\"}]}\n```";
        let violations = parse_llm_response(wrapped, "f.go", "@@ -3,0 +4 @@\n+x");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 4);
    }

    #[test]
    fn non_json_response_drops_everything() {
        let violations = parse_llm_response("sorry, I cannot help", "f.go", "@@ -3,0 +4 @@\n+x");
        assert!(violations.is_empty());
    }

    #[test]
    fn unknown_severity_degrades_to_warning() {
        let raw = r#"{"violations":[{"line":4,"rule":"R","message":"m","severity":"catastrophic"}]}"#;
        let violations = parse_llm_response(raw, "f.go", "@@ -3,0 +4 @@\n+x");
        assert_eq!(violations[0].severity, Severity::Warning);
    }
}
