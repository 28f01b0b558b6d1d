//! Rules-document rendering.
//!
//! Turns a [`MultiRepoResult`] into the `.prmate.md` markdown artifact with
//! a fixed section order: header, Folder Structure, Naming Conventions,
//! Abstractions, Error Handling, Test Conventions, the senior-developer
//! checklist, Learned Rules, Sources. The output is a pure function of the
//! scan results.

use std::collections::HashSet;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::{AnalysisResult, ErrorStyle};
use crate::multirepo::MultiRepoResult;
use crate::scanner::CodebaseInventory;

const MAX_CONVENTION_EXAMPLES: usize = 5;
const MAX_NAMING_EXAMPLES: usize = 3;
const MAX_EXTENSION_ROWS: usize = 10;

const SENIOR_DEV_CHECKLIST: &[&str] = &[
    "**File locations**: New files placed in correct folders per conventions above",
    "**Abstraction usage**: Uses existing services/handlers, doesn't bypass abstractions",
    "**Naming consistency**: Follows established naming patterns (suffixes, casing)",
    "**Interface compliance**: Implements required interfaces, defines new ones in consumer",
    "**Error handling**: Errors wrapped with context, no naked returns",
    "**Test coverage**: Tests colocated/placed correctly, follows naming convention",
    "**Security patterns**: No hardcoded secrets, proper input validation",
    "**Documentation**: Exported functions have comments, complex logic explained",
    "**Dependency injection**: Services injected, not created inline",
    "**Resource cleanup**: Proper use of defer for cleanup, context propagation",
];

/// Renders the complete rules document.
pub fn generate(result: &MultiRepoResult) -> String {
    let mut out = String::new();

    out.push_str("# PRMate Context\n\n");
    out.push_str("*Auto-generated PR review context. Do not edit directly.*\n\n");

    write_folder_structure(&mut out, &result.current_repo, &result.merged_analysis);
    write_naming_conventions(&mut out, &result.merged_analysis);
    write_abstractions(&mut out, &result.merged_analysis);
    write_error_handling(&mut out, &result.merged_analysis);
    write_test_conventions(&mut out, &result.merged_analysis);
    write_senior_dev_checklist(&mut out);

    if !result.merged_rules.is_empty() {
        write_learned_rules(&mut out, &result.merged_rules);
    }

    write_sources(&mut out, result);

    out
}

fn write_folder_structure(out: &mut String, repo: &CodebaseInventory, analysis: &AnalysisResult) {
    out.push_str("## Folder Structure\n\n");

    for convention in &analysis.folder_conventions {
        let _ = writeln!(out, "- **{}**: {}", convention.pattern, convention.purpose);
        if !convention.examples.is_empty() {
            let examples = &convention.examples[..convention.examples.len().min(MAX_CONVENTION_EXAMPLES)];
            let _ = writeln!(out, "  - Examples: `{}`", examples.join("`, `"));
        }
    }

    if !repo.top_level_folders.is_empty() {
        out.push_str("\n**Top-level directories:**\n");
        for folder in &repo.top_level_folders {
            let _ = writeln!(out, "- `{folder}/`");
        }
    }

    if !repo.extensions.is_empty() {
        out.push_str("\n**File types:**\n");

        let mut counts: Vec<(&String, &usize)> = repo.extensions.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (ext, count) in counts.into_iter().take(MAX_EXTENSION_ROWS) {
            let _ = writeln!(out, "- `{ext}`: {count} files");
        }
    }

    out.push('\n');
}

fn write_naming_conventions(out: &mut String, analysis: &AnalysisResult) {
    out.push_str("## Naming Conventions\n\n");

    let _ = writeln!(out, "- **Folder naming**: {}", analysis.folder_naming);
    let _ = writeln!(out, "- **File naming**: {}", analysis.file_naming);

    let recurring: Vec<_> = analysis
        .naming_patterns
        .iter()
        .filter(|p| p.count > 1)
        .collect();
    if !recurring.is_empty() {
        out.push_str("\n**Detected patterns:**\n");
        for pattern in recurring {
            let examples = &pattern.examples[..pattern.examples.len().min(MAX_NAMING_EXAMPLES)];
            let _ = writeln!(
                out,
                "- `{}` ({} occurrences): {}",
                pattern.pattern,
                pattern.count,
                examples.join(", ")
            );
        }
    }

    out.push('\n');
}

fn write_abstractions(out: &mut String, analysis: &AnalysisResult) {
    out.push_str("## Abstractions\n\n");

    if analysis.abstractions.is_empty() {
        out.push_str("*No specific abstraction patterns detected.*\n\n");
        return;
    }

    let services: Vec<_> = analysis
        .abstractions
        .iter()
        .filter(|a| !a.is_interface && a.name == "Service")
        .collect();
    let handlers: Vec<_> = analysis
        .abstractions
        .iter()
        .filter(|a| !a.is_interface && a.name == "Handler")
        .collect();
    let interfaces: Vec<_> = analysis
        .abstractions
        .iter()
        .filter(|a| a.is_interface)
        .collect();
    let others: Vec<_> = analysis
        .abstractions
        .iter()
        .filter(|a| !a.is_interface && a.name != "Service" && a.name != "Handler")
        .collect();

    if !services.is_empty() {
        out.push_str("**Services:**\n");
        for svc in services {
            let _ = writeln!(out, "- `*{}` suffix ({} files)", svc.suffix, svc.locations.len());
        }
        out.push('\n');
    }

    if !handlers.is_empty() {
        out.push_str("**Handlers:**\n");
        for handler in handlers {
            let _ = writeln!(
                out,
                "- `*{}` suffix ({} files)",
                handler.suffix,
                handler.locations.len()
            );
        }
        out.push('\n');
    }

    if !interfaces.is_empty() {
        out.push_str("**Interfaces:**\n");
        let _ = writeln!(out, "- Found in {} files", interfaces[0].locations.len());
        out.push_str("- Define interfaces in consumer packages\n\n");
    }

    if !others.is_empty() {
        out.push_str("**Other patterns:**\n");
        for other in others {
            let _ = writeln!(out, "- `*{}` ({} files)", other.suffix, other.locations.len());
        }
        out.push('\n');
    }
}

fn write_error_handling(out: &mut String, analysis: &AnalysisResult) {
    out.push_str("## Error Handling\n\n");

    if analysis.error_patterns.is_empty() {
        out.push_str("*No specific error patterns detected.*\n\n");
        return;
    }

    for pattern in &analysis.error_patterns {
        match pattern.style {
            ErrorStyle::Wrap => {
                let _ = writeln!(
                    out,
                    "- **Error wrapping**: Wrap errors with context using `fmt.Errorf(\"context: %w\", err)` ({} occurrences)",
                    pattern.count
                );
            }
            ErrorStyle::Raw => {
                let _ = writeln!(
                    out,
                    "- **Raw returns**: Found {} raw error returns (consider wrapping with context)",
                    pattern.count
                );
            }
            ErrorStyle::Custom => {
                let _ = writeln!(out, "- **Custom error types**: {} occurrences", pattern.count);
            }
        }
    }

    out.push('\n');
}

fn write_test_conventions(out: &mut String, analysis: &AnalysisResult) {
    out.push_str("## Test Conventions\n\n");

    let convention = &analysis.test_conventions;
    let _ = writeln!(out, "- **Test suffix**: `{}`", convention.test_suffix);

    if convention.colocated {
        out.push_str("- **Location**: Tests colocated with source files\n");
    } else if convention.separate_folder {
        out.push_str("- **Location**: Tests in separate folder\n");
    }

    if !convention.examples.is_empty() {
        let examples: Vec<String> = convention
            .examples
            .iter()
            .take(MAX_NAMING_EXAMPLES)
            .map(|p| p.display().to_string())
            .collect();
        let _ = writeln!(out, "- **Examples**: `{}`", examples.join("`, `"));
    }

    out.push('\n');
}

fn write_senior_dev_checklist(out: &mut String) {
    out.push_str("## Senior Developer Review Checklist\n\n");
    for item in SENIOR_DEV_CHECKLIST {
        let _ = writeln!(out, "- [ ] {item}");
    }
    out.push('\n');
}

fn write_learned_rules(out: &mut String, rules: &[String]) {
    out.push_str("## Learned Rules\n\n");

    // Rules arrive pre-merged, but renderers must stay safe to call with
    // any input, so dedup again on the way out.
    let mut seen = HashSet::new();
    for rule in rules {
        let normalized = rule.trim().to_lowercase();
        if normalized.is_empty() || !seen.insert(normalized) {
            continue;
        }
        let _ = writeln!(out, "- {rule}");
    }

    out.push('\n');
}

fn write_sources(out: &mut String, result: &MultiRepoResult) {
    out.push_str("## Sources\n\n");
    let _ = writeln!(out, "- **Current repository**: `{}`", result.current_repo.repo_name);

    if !result.external_repos.is_empty() {
        out.push_str("\n**External repositories scanned:**\n");
        for external in &result.external_repos {
            let status = if let Some(err) = &external.error {
                format!("error: {err}")
            } else if external.source.has_prmate {
                ".prmate.md found".to_string()
            } else {
                "scanned".to_string()
            };
            let _ = writeln!(out, "- `{}` ({})", external.source.address, status);
        }
    }

    out.push('\n');
}

/// Writes the generated content as `.prmate.md` inside a repo working copy.
pub fn write_to_repo(content: &str, repo_path: &Path) -> std::io::Result<PathBuf> {
    let output_path = repo_path.join(".prmate.md");
    fs::write(&output_path, content)?;
    Ok(output_path)
}

/// Writes the generated content to a kept temp file and returns its path.
pub fn write_to_temp(content: &str) -> std::io::Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix("prmate-")
        .suffix(".md")
        .tempfile()?;
    fs::write(file.path(), content)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalysisResult;
    use crate::scanner::CodebaseInventory;

    fn result_with_rules(rules: Vec<String>) -> MultiRepoResult {
        let mut current_repo = CodebaseInventory::default();
        current_repo.repo_name = "widgets".into();
        current_repo.top_level_folders = vec!["internal".into(), "cmd".into()];
        current_repo.extensions.insert(".go".into(), 12);
        current_repo.extensions.insert(".md".into(), 2);

        MultiRepoResult {
            current_repo,
            current_analysis: AnalysisResult::default(),
            merged_analysis: AnalysisResult::default(),
            external_repos: Vec::new(),
            merged_rules: rules,
        }
    }

    #[test]
    fn sections_render_in_fixed_order() {
        let doc = generate(&result_with_rules(vec!["Wrap errors with %w everywhere".into()]));

        let order = [
            "# PRMate Context",
            "## Folder Structure",
            "## Naming Conventions",
            "## Abstractions",
            "## Error Handling",
            "## Test Conventions",
            "## Senior Developer Review Checklist",
            "## Learned Rules",
            "## Sources",
        ];
        let mut last = 0;
        for heading in order {
            let pos = doc.find(heading).unwrap_or_else(|| panic!("missing {heading}"));
            assert!(pos >= last, "{heading} out of order");
            last = pos;
        }
    }

    #[test]
    fn every_merged_rule_appears_in_learned_rules() {
        let rules = vec![
            "Wrap errors with fmt.Errorf and %w".to_string(),
            "Inject dependencies via constructors".to_string(),
            "Keep handlers free of business logic".to_string(),
        ];
        let doc = generate(&result_with_rules(rules.clone()));

        let learned = doc.split("## Learned Rules").nth(1).unwrap();
        for rule in &rules {
            assert!(learned.contains(rule), "missing rule: {rule}");
        }
    }

    #[test]
    fn duplicate_rules_render_once() {
        let doc = generate(&result_with_rules(vec![
            "Wrap errors with fmt.Errorf and %w".into(),
            "wrap errors with fmt.errorf and %w".into(),
        ]));

        let count = doc.matches("Wrap errors with fmt.Errorf and %w").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn extension_rows_sorted_by_count() {
        let doc = generate(&result_with_rules(Vec::new()));
        let go_pos = doc.find("`.go`: 12 files").unwrap();
        let md_pos = doc.find("`.md`: 2 files").unwrap();
        assert!(go_pos < md_pos);
    }

    #[test]
    fn checklist_has_ten_items() {
        let doc = generate(&result_with_rules(Vec::new()));
        let checklist = doc
            .split("## Senior Developer Review Checklist")
            .nth(1)
            .unwrap()
            .split("##")
            .next()
            .unwrap();
        assert_eq!(checklist.matches("- [ ]").count(), 10);
    }

    #[test]
    fn no_learned_rules_section_when_empty() {
        let doc = generate(&result_with_rules(Vec::new()));
        assert!(!doc.contains("## Learned Rules"));
    }
}
