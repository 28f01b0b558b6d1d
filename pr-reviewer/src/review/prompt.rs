//! Step D3: analysis prompt assembly.
//!
//! The prompt carries rules, checklist, codebase context, dependency hints,
//! the diff, and (when small enough) the full file, then pins the model to
//! a strict JSON response shape anchored to added lines.

use std::fmt::Write;

use crate::review::rules::LoadedRules;

/// Full file content above this size is left out of the prompt.
const MAX_INLINE_CONTENT_CHARS: usize = 10_000;

const RESPONSE_CONTRACT: &str = r#"
## Response Format
Respond with a JSON object containing violations found. Only report violations for ADDED or MODIFIED lines (lines starting with + in the diff).
If no violations are found, return {"violations": []}.

Example response:
{"violations": [{"line": 42, "rule": "Error Handling", "message": "Error not wrapped with context", "severity": "warning", "fix": "Use fmt.Errorf(\"context: %w\", err)"}]}

Important:
- Only flag clear violations, not style preferences
- Line numbers should reference the NEW file line numbers (from lines starting with +)
- Be specific about what rule is violated and how to fix it
- Severity: "error" for breaking issues, "warning" for best practices, "suggestion" for improvements
- Check that the code correctly implements interfaces and follows patterns from the dependency context

Respond with ONLY the JSON, no additional text.
"#;

/// Builds the per-file analysis prompt.
pub fn build_analysis_prompt(
    file_path: &str,
    file_content: &str,
    patch: &str,
    loaded: &LoadedRules,
    dependency_context: &str,
) -> String {
    let mut p = String::new();

    p.push_str(
        "You are a senior code reviewer. Analyze the following code changes and identify any violations of the project's coding standards.\n\n",
    );

    p.push_str("## Project Rules and Conventions\n");
    for (i, rule) in loaded.rules.iter().enumerate() {
        let _ = writeln!(p, "{}. {}", i + 1, rule);
    }

    if !loaded.checklist.is_empty() {
        p.push_str("\n## Review Checklist\n");
        for item in &loaded.checklist {
            let _ = writeln!(p, "- [ ] {item}");
        }
    }

    if !loaded.codebase_info.is_empty() {
        p.push_str("\n## Codebase Context\n");
        p.push_str(&loaded.codebase_info);
    }

    if !dependency_context.is_empty() {
        p.push_str("\n## Related Files (Dependencies/Interfaces)\n");
        p.push_str(
            "Use this context to understand types, interfaces, and patterns the changed code should follow:\n",
        );
        p.push_str(dependency_context);
    }

    let _ = write!(p, "\n## File Being Reviewed: {file_path}\n");

    if !patch.is_empty() {
        p.push_str("\n### Changes (Diff)\n```diff\n");
        p.push_str(patch);
        p.push_str("\n```\n");
    }

    if !file_content.is_empty() && file_content.len() < MAX_INLINE_CONTENT_CHARS {
        p.push_str("\n### Full File Content\n```\n");
        p.push_str(file_content);
        p.push_str("\n```\n");
    }

    p.push_str(RESPONSE_CONTRACT);
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> LoadedRules {
        LoadedRules {
            rules: vec!["Wrap errors with fmt.Errorf and %w".into()],
            checklist: vec!["Check error handling patterns".into()],
            codebase_info: "\n## Error Handling\nwrap everything\n".into(),
        }
    }

    #[test]
    fn prompt_carries_all_sections() {
        let p = build_analysis_prompt(
            "handler.go",
            "package main\n",
            "@@ -1,1 +1,2 @@\n line\n+added",
            &loaded(),
            "\n### internal/review/types.go\n```\ntype T struct{}\n```\n",
        );

        assert!(p.contains("1. Wrap errors with fmt.Errorf and %w"));
        assert!(p.contains("- [ ] Check error handling patterns"));
        assert!(p.contains("## Codebase Context"));
        assert!(p.contains("## Related Files"));
        assert!(p.contains("## File Being Reviewed: handler.go"));
        assert!(p.contains("```diff"));
        assert!(p.contains("Respond with ONLY the JSON"));
    }

    #[test]
    fn oversized_content_left_out() {
        let big = "x".repeat(MAX_INLINE_CONTENT_CHARS + 1);
        let p = build_analysis_prompt("a.go", &big, "", &loaded(), "");
        assert!(!p.contains("Full File Content"));
    }
}
