//! Steps B and F: the persisted review summary.
//!
//! State lives inside a PR-level comment, bracketed by two literal markers:
//! the first line `<!-- prmate-review-summary:<HEAD_SHA> -->` and a trailing
//! `<!-- prmate-data:<JSON> -->` carrying the canonical summary object.
//! Both markers are wire format; changing either requires a schema-version
//! bump.

use std::fmt::Write;

use tracing::debug;

use crate::errors::{Error, MrResult};
use crate::hosting::HostClient;
use crate::review::{ReviewRequest, ReviewSummary, short_sha};

pub const SUMMARY_MARKER_PREFIX: &str = "<!-- prmate-review-summary:";
pub const SUMMARY_MARKER_SUFFIX: &str = " -->";
pub const DATA_MARKER_PREFIX: &str = "<!-- prmate-data:";
pub const DATA_MARKER_SUFFIX: &str = " -->";

/// Current summary schema version.
pub const SUMMARY_VERSION: &str = "1.0";

/// Scans PR comments from newest backward for the latest summary.
///
/// Returns `Ok(None)` when no summary comment exists; a summary comment
/// that fails to parse is an error the caller may downgrade to "no prior
/// summary".
pub async fn load_previous(
    host: &HostClient,
    req: &ReviewRequest,
) -> MrResult<Option<ReviewSummary>> {
    let comments = host
        .list_pr_comments(&req.owner, &req.repo, req.pr_number)
        .await?;

    for comment in comments.iter().rev() {
        if comment.contains(SUMMARY_MARKER_PREFIX) {
            return parse_summary_comment(comment).map(Some);
        }
    }

    Ok(None)
}

/// Extracts the canonical summary JSON from a comment body.
pub fn parse_summary_comment(comment: &str) -> MrResult<ReviewSummary> {
    let idx = comment
        .find(DATA_MARKER_PREFIX)
        .ok_or_else(|| Error::Validation("no summary data found".into()))?;
    let start = idx + DATA_MARKER_PREFIX.len();
    let end = comment[start..]
        .find(DATA_MARKER_SUFFIX)
        .ok_or_else(|| Error::Validation("malformed summary data".into()))?;

    serde_json::from_str(&comment[start..start + end])
        .map_err(|e| Error::Validation(format!("parse summary json: {e}")))
}

/// Renders the full summary comment: marker line, human-readable table,
/// collapsible file list, trailing data marker.
pub fn render_summary_comment(head_sha: &str, summary: &ReviewSummary) -> MrResult<String> {
    let json = serde_json::to_string(summary)
        .map_err(|e| Error::Validation(format!("marshal summary: {e}")))?;

    let mut out = String::new();
    let _ = writeln!(out, "{SUMMARY_MARKER_PREFIX}{head_sha}{SUMMARY_MARKER_SUFFIX}");

    out.push_str("## 📊 PRMate Review Summary\n\n");
    out.push_str("| Metric | Value |\n|--------|-------|\n");
    let _ = writeln!(out, "| Files Reviewed | {} |", summary.files_scanned.len());
    let _ = writeln!(out, "| Rules Applied | {} |", summary.rules_applied);
    let _ = writeln!(out, "| Issues Found | {} |", summary.violations_found);
    let _ = writeln!(out, "| Commit | `{}` |", short_sha(&summary.head_sha));

    if !summary.files_scanned.is_empty() {
        out.push_str("\n<details>\n<summary>Files Reviewed</summary>\n\n");
        for file in &summary.files_scanned {
            let status = if file.violations > 0 {
                format!("⚠️ {} issue(s)", file.violations)
            } else {
                "✅".to_string()
            };
            let _ = writeln!(out, "- `{}` {}", file.path, status);
        }
        out.push_str("</details>\n");
    }

    let _ = write!(out, "\n{DATA_MARKER_PREFIX}{json}{DATA_MARKER_SUFFIX}");
    Ok(out)
}

/// Posts the summary as a PR comment.
pub async fn post(host: &HostClient, req: &ReviewRequest, summary: &ReviewSummary) -> MrResult<()> {
    let body = render_summary_comment(&req.head_sha, summary)?;
    host.create_pr_comment(&req.owner, &req.repo, req.pr_number, &body)
        .await?;
    debug!(pr = req.pr_number, "summary comment posted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::FileReviewStatus;
    use chrono::Utc;

    fn sample() -> ReviewSummary {
        ReviewSummary {
            version: SUMMARY_VERSION.to_string(),
            last_reviewed_at: Utc::now(),
            head_sha: "abc123def456".to_string(),
            files_scanned: vec![FileReviewStatus {
                path: "main.go".to_string(),
                last_sha: "abc123".to_string(),
                violations: 1,
                reviewed_at: Utc::now().to_rfc3339(),
            }],
            rules_applied: 5,
            violations_found: 2,
        }
    }

    #[test]
    fn render_parse_round_trip() {
        let summary = sample();
        let comment = render_summary_comment(&summary.head_sha, &summary).unwrap();

        assert!(comment.starts_with("<!-- prmate-review-summary:abc123def456 -->\n"));
        assert!(comment.contains("| Files Reviewed | 1 |"));
        assert!(comment.contains("| Commit | `abc123d` |"));

        let parsed = parse_summary_comment(&comment).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn parse_rejects_comment_without_data() {
        let err = parse_summary_comment("<!-- prmate-review-summary:abc -->\njust text").unwrap_err();
        assert!(err.to_string().contains("no summary data"));
    }

    #[test]
    fn parse_rejects_unterminated_data() {
        let err = parse_summary_comment("<!-- prmate-data:{\"version\":\"1.0\"").unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
