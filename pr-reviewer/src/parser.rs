//! Unified-diff parser for PR file patches.
//!
//! Features:
//! - Works even if file headers (---/+++) are missing (hunks-only input);
//!   prelude lines before the first `@@` never count as adds/removes.
//! - Tolerates the single-line header form `@@ -A +B @@` (length defaults
//!   to 1).
//! - Ignores `\ No newline at end of file` marker lines.
//! - A malformed hunk header skips that hunk and continues with the next.
//!
//! Every parsed line carries its old/new line numbers and `diff_pos`, the
//! 1-indexed position within the original patch text.

/// Classification of a single diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Add,
    Remove,
    Context,
}

/// One line inside a hunk.
#[derive(Debug, Clone)]
pub struct PatchLine {
    pub kind: LineKind,
    /// Line number in the old file (absent for additions).
    pub old_line: Option<u32>,
    /// Line number in the new file (absent for removals).
    pub new_line: Option<u32>,
    /// 1-indexed position of this line within the patch text.
    pub diff_pos: u32,
    pub content: String,
}

/// A single `@@`-delimited hunk.
#[derive(Debug, Clone, Default)]
pub struct PatchHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<PatchLine>,
}

/// Parses a unified diff string into hunks/lines.
/// Robust to missing file headers; only `@@` headers are required.
pub fn parse_patch(patch: &str) -> Vec<PatchHunk> {
    let mut hunks: Vec<PatchHunk> = Vec::new();
    let mut current: Option<PatchHunk> = None;
    let mut old_line = 0u32;
    let mut new_line = 0u32;

    for (idx, line) in patch.lines().enumerate() {
        let diff_pos = (idx + 1) as u32;

        if line.starts_with("@@") {
            if let Some(hunk) = current.take() {
                hunks.push(hunk);
            }
            match parse_hunk_header(line) {
                Some((o_start, o_lines, n_start, n_lines)) => {
                    old_line = o_start;
                    new_line = n_start;
                    current = Some(PatchHunk {
                        old_start: o_start,
                        old_lines: o_lines,
                        new_start: n_start,
                        new_lines: n_lines,
                        lines: Vec::new(),
                    });
                }
                // Malformed header: drop this hunk, keep scanning.
                None => current = None,
            }
            continue;
        }

        // `\ No newline at end of file` markers are not diff content.
        if line.starts_with('\\') {
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            // Prelude (file headers, commit noise) before the first '@@'.
            continue;
        };

        if let Some(rest) = line.strip_prefix('+') {
            hunk.lines.push(PatchLine {
                kind: LineKind::Add,
                old_line: None,
                new_line: Some(new_line),
                diff_pos,
                content: rest.to_string(),
            });
            new_line += 1;
        } else if let Some(rest) = line.strip_prefix('-') {
            hunk.lines.push(PatchLine {
                kind: LineKind::Remove,
                old_line: Some(old_line),
                new_line: None,
                diff_pos,
                content: rest.to_string(),
            });
            old_line += 1;
        } else {
            // Context (leading space) or anything unexpected: treat as context.
            let rest = line.strip_prefix(' ').unwrap_or(line);
            hunk.lines.push(PatchLine {
                kind: LineKind::Context,
                old_line: Some(old_line),
                new_line: Some(new_line),
                diff_pos,
                content: rest.to_string(),
            });
            old_line += 1;
            new_line += 1;
        }
    }

    if let Some(hunk) = current.take() {
        hunks.push(hunk);
    }
    hunks
}

/// Returns the new-file line numbers of all added lines, in patch order.
pub fn added_line_numbers(patch: &str) -> Vec<u32> {
    parse_patch(patch)
        .iter()
        .flat_map(|h| h.lines.iter())
        .filter(|l| l.kind == LineKind::Add)
        .filter_map(|l| l.new_line)
        .collect()
}

/// Parses `@@ -A[,B] +C[,D] @@ ...` into (A, B, C, D).
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let rest = line.strip_prefix("@@")?;
    let end = rest.find("@@")?;
    let nums = rest[..end].trim();

    let (left, right) = nums.split_once('+')?;
    let left = left.trim().strip_prefix('-')?;
    let (old_start, old_lines) = parse_range(left)?;
    let (new_start, new_lines) = parse_range(right.trim())?;
    Some((old_start, old_lines, new_start, new_lines))
}

/// Splits "12,7" into (12, 7) and "12" into (12, 1).
fn parse_range(s: &str) -> Option<(u32, u32)> {
    match s.split_once(',') {
        Some((start, len)) => Some((start.trim().parse().ok()?, len.trim().parse().ok()?)),
        None => Some((s.trim().parse().ok()?, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_yields_nothing() {
        assert!(parse_patch("").is_empty());
        assert!(added_line_numbers("").is_empty());
    }

    #[test]
    fn single_hunk_with_additions() {
        let patch = "@@ -1,3 +1,5 @@\n package main\n+\n+import \"fmt\"\n \n func main() {";
        let hunks = parse_patch(patch);
        assert_eq!(hunks.len(), 1);
        assert_eq!(added_line_numbers(patch), vec![2, 3]);
    }

    #[test]
    fn multiple_hunks() {
        let patch = "@@ -1,3 +1,4 @@\n package main\n+import \"fmt\"\n \n func main() {\n@@ -10,3 +11,4 @@\n }\n+\n+func helper() {}";
        let hunks = parse_patch(patch);
        assert_eq!(hunks.len(), 2);
        assert_eq!(added_line_numbers(patch), vec![2, 12, 13]);
    }

    #[test]
    fn single_line_header_defaults_to_one() {
        let patch = "@@ -3,0 +4 @@\n+\treturn err";
        let hunks = parse_patch(patch);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].new_start, 4);
        assert_eq!(hunks[0].new_lines, 1);
        assert_eq!(added_line_numbers(patch), vec![4]);
    }

    #[test]
    fn file_headers_are_prelude_not_content() {
        let patch = "--- a/main.go\n+++ b/main.go\n@@ -1,2 +1,3 @@\n line\n+added\n line2";
        let hunks = parse_patch(patch);
        assert_eq!(hunks.len(), 1);
        // The +++ header must not register as an addition.
        assert_eq!(added_line_numbers(patch), vec![2]);
    }

    #[test]
    fn malformed_header_skips_hunk_and_continues() {
        let patch = "@@ not a header @@\n+garbage\n@@ -1,1 +1,2 @@\n keep\n+real";
        let hunks = parse_patch(patch);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].new_start, 1);
        assert_eq!(added_line_numbers(patch), vec![2]);
    }

    #[test]
    fn no_newline_marker_ignored() {
        let patch = "@@ -1,1 +1,1 @@\n-old\n\\ No newline at end of file\n+new\n\\ No newline at end of file";
        let hunks = parse_patch(patch);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].lines.len(), 2);
    }

    #[test]
    fn line_accounting_matches_header_counts() {
        let patch = "@@ -1,3 +1,5 @@\n context\n+one\n+two\n context\n context";
        let hunks = parse_patch(patch);
        let hunk = &hunks[0];

        let adds = hunk.lines.iter().filter(|l| l.kind == LineKind::Add).count() as u32;
        let removes = hunk
            .lines
            .iter()
            .filter(|l| l.kind == LineKind::Remove)
            .count() as u32;
        let contexts = hunk
            .lines
            .iter()
            .filter(|l| l.kind == LineKind::Context)
            .count() as u32;

        assert_eq!(adds + contexts, hunk.new_lines);
        assert_eq!(removes + contexts, hunk.old_lines);
    }

    #[test]
    fn diff_pos_counts_every_patch_line() {
        let patch = "@@ -1,1 +1,2 @@\n context\n+added";
        let hunks = parse_patch(patch);
        let lines = &hunks[0].lines;
        assert_eq!(lines[0].diff_pos, 2);
        assert_eq!(lines[1].diff_pos, 3);
    }
}
