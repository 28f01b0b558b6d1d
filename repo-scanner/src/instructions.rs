//! Instruction-file discovery and directive parsing.
//!
//! Probes a fixed set of known convention files (Copilot, Cursor, PRMate,
//! CONTRIBUTING variants), splits markdown into sections, extracts
//! actionable rules, and understands the `@scan`/`@scanned`/`@prmate`
//! directive markers.

use std::fs;
use std::path::{Path, PathBuf};

/// Source category of an instruction file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionCategory {
    Copilot,
    Cursor,
    Prmate,
    Contributing,
}

impl InstructionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            InstructionCategory::Copilot => "copilot",
            InstructionCategory::Cursor => "cursor",
            InstructionCategory::Prmate => "prmate",
            InstructionCategory::Contributing => "contributing",
        }
    }
}

/// Paths probed for instruction content, with their categories.
pub const KNOWN_INSTRUCTION_FILES: &[(&str, InstructionCategory)] = &[
    (".github/copilot-instructions.md", InstructionCategory::Copilot),
    (".cursorrules", InstructionCategory::Cursor),
    (".cursor/rules", InstructionCategory::Cursor),
    (".prmate.md", InstructionCategory::Prmate),
    ("CONTRIBUTING.md", InstructionCategory::Contributing),
    ("docs/CONTRIBUTING.md", InstructionCategory::Contributing),
    (".github/CONTRIBUTING.md", InstructionCategory::Contributing),
];

/// A parsed instruction file.
#[derive(Debug, Clone)]
pub struct InstructionFile {
    pub path: PathBuf,
    pub category: InstructionCategory,
    pub content: String,
    pub sections: Vec<InstructionSection>,
}

/// One section of an instruction file.
#[derive(Debug, Clone)]
pub struct InstructionSection {
    pub title: String,
    pub content: String,
    /// Heading level (1-6); 1 for non-markdown bodies.
    pub level: usize,
}

/// Reads every known instruction file present under `repo_path`.
pub fn read_instructions(repo_path: &Path) -> Vec<InstructionFile> {
    let mut instructions = Vec::new();

    for (rel_path, category) in KNOWN_INSTRUCTION_FILES {
        let full_path = repo_path.join(rel_path);
        let Ok(content) = fs::read_to_string(&full_path) else {
            continue;
        };

        let sections = if rel_path.ends_with(".md") {
            parse_markdown_sections(&content)
        } else {
            // Non-markdown bodies become a single section.
            vec![InstructionSection {
                title: "Rules".into(),
                content: content.clone(),
                level: 1,
            }]
        };

        instructions.push(InstructionFile {
            path: full_path,
            category: *category,
            content,
            sections,
        });
    }

    instructions
}

/// Reads `.prmate.md` specifically.
pub fn read_prmate_context(repo_path: &Path) -> std::io::Result<InstructionFile> {
    let full_path = repo_path.join(".prmate.md");
    let content = fs::read_to_string(&full_path)?;
    let sections = parse_markdown_sections(&content);

    Ok(InstructionFile {
        path: full_path,
        category: InstructionCategory::Prmate,
        content,
        sections,
    })
}

/// Splits markdown into sections at `#`-prefixed lines.
pub fn parse_markdown_sections(content: &str) -> Vec<InstructionSection> {
    let mut sections = Vec::new();
    let mut current: Option<InstructionSection> = None;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('#') {
            if let Some(mut section) = current.take() {
                section.content = section.content.trim().to_string();
                sections.push(section);
            }

            let level = trimmed.chars().take_while(|c| *c == '#').count();
            current = Some(InstructionSection {
                title: trimmed.trim_start_matches('#').trim().to_string(),
                content: String::new(),
                level,
            });
        } else if let Some(section) = current.as_mut() {
            section.content.push_str(line);
            section.content.push('\n');
        }
    }

    if let Some(mut section) = current.take() {
        section.content = section.content.trim().to_string();
        sections.push(section);
    }

    sections
}

const RULE_INDICATORS: &[&str] = &[
    "rule",
    "convention",
    "practice",
    "guideline",
    "principle",
    "pattern",
    "style",
    "requirement",
    "must",
    "should",
    "standard",
    "code quality",
];

/// Extracts actionable rules from instruction files: bullet and numbered
/// items under rule-indicating section titles.
pub fn extract_rules(instructions: &[InstructionFile]) -> Vec<String> {
    let mut rules = Vec::new();

    for inst in instructions {
        for section in &inst.sections {
            let title = section.title.to_lowercase();
            if RULE_INDICATORS.iter().any(|ind| title.contains(ind)) {
                rules.extend(extract_bullet_points(&section.content));
            }
        }
    }

    rules
}

/// Bullet (`-`, `*`, `+`) and simple `N.` numbered items longer than 10
/// characters.
pub fn extract_bullet_points(content: &str) -> Vec<String> {
    let mut rules = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();

        let bullet = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
            .or_else(|| trimmed.strip_prefix("+ "));
        if let Some(rule) = bullet {
            let rule = rule.trim();
            if rule.len() > 10 {
                rules.push(rule.to_string());
            }
            continue;
        }

        // Numbered items: "1. rule" through "99. rule".
        if trimmed.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            if let Some(dot) = trimmed.find('.') {
                if dot > 0 && dot < 3 {
                    let rule = trimmed[dot + 1..].trim();
                    if rule.len() > 10 {
                        rules.push(rule.to_string());
                    }
                }
            }
        }
    }

    rules
}

/// True when `@scan` appears and is not actually the processed marker
/// `@scanned` (checked by peeking at the next character).
pub fn has_scan_directive(content: &str) -> bool {
    let Some(idx) = content.find("@scan") else {
        return false;
    };

    match content.as_bytes().get(idx + "@scan".len()) {
        Some(b'n') => false,
        _ => true,
    }
}

/// True when `@prmate` appears anywhere.
pub fn has_prmate_directive(content: &str) -> bool {
    content.contains("@prmate")
}

/// Extracts repo addresses from an `@scan` block:
/// `<!-- PRMate\n@scan\nowner/repo\n-->`. Lines must look like repo
/// references (contain `/` or start with `github.com`).
pub fn parse_scan_directive(content: &str) -> Vec<String> {
    let Some(start) = content.find("@scan") else {
        return Vec::new();
    };

    let block = match content[start..].find("-->") {
        Some(end) => &content[start..start + end],
        None => &content[start..],
    };

    block
        .lines()
        .skip(1) // the @scan line itself
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "-->")
        .filter(|line| line.contains('/') || line.starts_with("github.com"))
        .map(str::to_string)
        .collect()
}

/// Marks the directive as consumed: first `@scan` becomes `@scanned`.
/// Content without a live directive is returned unchanged.
pub fn mark_scan_processed(content: &str) -> String {
    if !has_scan_directive(content) {
        return content.to_string();
    }
    content.replacen("@scan", "@scanned", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn known_files_discovered_with_categories() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join(".github")).unwrap();
        std::fs::write(root.join(".prmate.md"), "# Context\n## Rules\n- Always wrap errors properly\n").unwrap();
        std::fs::write(root.join(".cursorrules"), "be terse and deterministic\n").unwrap();
        std::fs::write(
            root.join(".github/copilot-instructions.md"),
            "## Conventions\n- Keep handlers thin and testable\n",
        )
        .unwrap();

        let instructions = read_instructions(root);
        assert_eq!(instructions.len(), 3);

        let cursor = instructions
            .iter()
            .find(|i| i.category == InstructionCategory::Cursor)
            .unwrap();
        // Non-markdown files collapse into one "Rules" section.
        assert_eq!(cursor.sections.len(), 1);
        assert_eq!(cursor.sections[0].title, "Rules");
    }

    #[test]
    fn rules_extracted_from_indicator_sections_only() {
        let inst = InstructionFile {
            path: PathBuf::from(".prmate.md"),
            category: InstructionCategory::Prmate,
            content: String::new(),
            sections: parse_markdown_sections(
                "## Learned Rules\n- Wrap errors with fmt.Errorf and %w\n1. Inject dependencies via constructors\n## History\n- This bullet is off topic but long\n",
            ),
        };

        let rules = extract_rules(&[inst]);
        assert_eq!(
            rules,
            vec![
                "Wrap errors with fmt.Errorf and %w".to_string(),
                "Inject dependencies via constructors".to_string(),
            ]
        );
    }

    #[test]
    fn scan_directive_detection() {
        assert!(has_scan_directive("<!-- PRMate\n@scan\nowner/repo\n-->"));
        assert!(!has_scan_directive("<!-- PRMate\n@scanned\nowner/repo\n-->"));
        assert!(!has_scan_directive("no directives here"));
    }

    #[test]
    fn prmate_directive_is_substring_match() {
        assert!(has_prmate_directive("hey @prmate please rescan"));
        assert!(!has_prmate_directive("hey @prm please"));
    }

    #[test]
    fn scan_block_parsing() {
        let content = "# Title\n<!-- PRMate\n@scan\nowner/repo\ngithub.com/a/b\nnot a repo ref\n-->\nrest";
        let repos = parse_scan_directive(content);
        assert_eq!(repos, vec!["owner/repo".to_string(), "github.com/a/b".to_string()]);
    }

    #[test]
    fn scan_block_without_terminator_runs_to_end() {
        let content = "@scan\nowner/repo";
        assert_eq!(parse_scan_directive(content), vec!["owner/repo".to_string()]);
    }

    #[test]
    fn mark_processed_replaces_first_occurrence() {
        assert_eq!(
            mark_scan_processed("<!-- PRMate\n@scan\nowner/repo\n-->"),
            "<!-- PRMate\n@scanned\nowner/repo\n-->"
        );
        assert_eq!(mark_scan_processed("# Just content"), "# Just content");
        assert_eq!(mark_scan_processed("<!-- @scanned -->"), "<!-- @scanned -->");
    }

    #[test]
    fn markdown_sections_capture_levels() {
        let sections = parse_markdown_sections("# One\nbody\n### Deep\nmore\n");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].level, 1);
        assert_eq!(sections[1].level, 3);
        assert_eq!(sections[1].title, "Deep");
    }
}
