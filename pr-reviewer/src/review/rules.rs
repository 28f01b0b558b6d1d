//! Step A: load and route the rules document.
//!
//! `.prmate.md` is fetched at the PR head ref and split into markdown
//! sections. Section titles decide where content goes: checklist items,
//! bullet rules, or verbatim codebase info for the prompt.

use regex::Regex;

use crate::errors::MrResult;
use crate::hosting::HostClient;
use crate::review::ReviewRequest;

/// Repo-relative path of the rules document.
pub const RULES_DOCUMENT: &str = ".prmate.md";

/// Output of rules loading, consumed by the prompt builder.
#[derive(Debug, Clone, Default)]
pub struct LoadedRules {
    pub rules: Vec<String>,
    pub checklist: Vec<String>,
    pub codebase_info: String,
}

/// Fetches `.prmate.md` at the request's head ref and routes its sections.
pub async fn load_rules(host: &HostClient, req: &ReviewRequest) -> MrResult<LoadedRules> {
    let content = host
        .get_file_content(&req.owner, &req.repo, RULES_DOCUMENT, &req.head_ref)
        .await?;
    Ok(route_sections(&content))
}

/// Routes markdown sections by title keywords.
pub fn route_sections(content: &str) -> LoadedRules {
    let mut loaded = LoadedRules::default();

    for section in parse_markdown_sections(content) {
        let title = section.title.to_lowercase();

        if title.contains("checklist") || title.contains("review") {
            loaded
                .checklist
                .extend(extract_checklist_items(&section.content));
        }

        if title.contains("rule") || title.contains("convention") {
            loaded.rules.extend(extract_bullet_points(&section.content));
        }

        if title.contains("structure")
            || title.contains("abstraction")
            || title.contains("naming")
            || title.contains("error")
        {
            loaded.codebase_info.push_str(&format!(
                "\n## {}\n{}\n",
                section.title, section.content
            ));
        }
    }

    loaded
}

struct MarkdownSection {
    title: String,
    content: String,
}

fn parse_markdown_sections(content: &str) -> Vec<MarkdownSection> {
    let mut sections = Vec::new();
    let mut current: Option<MarkdownSection> = None;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('#') {
            if let Some(mut section) = current.take() {
                section.content = section.content.trim().to_string();
                sections.push(section);
            }
            current = Some(MarkdownSection {
                title: trimmed.trim_start_matches('#').trim().to_string(),
                content: String::new(),
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

/// Pulls bullet items; anything 10 characters or shorter is noise.
fn extract_bullet_points(content: &str) -> Vec<String> {
    let mut rules = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        let rule = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
            .or_else(|| trimmed.strip_prefix("+ "));

        if let Some(rule) = rule {
            let rule = rule.trim();
            if rule.len() > 10 {
                rules.push(rule.to_string());
            }
        }
    }

    rules
}

/// Matches checkbox items: `- [ ] item` or `- [x] item`.
fn extract_checklist_items(content: &str) -> Vec<String> {
    let re = Regex::new(r"-\s*\[[ x]\]\s*(.+)").unwrap();

    re.captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|item| item.len() > 5)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_split_on_headings() {
        let content = "# Top\nintro\n## Learned Rules\n- Wrap errors with fmt.Errorf and %w\n## Other\nbody";
        let sections = parse_markdown_sections(content);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[1].title, "Learned Rules");
        assert_eq!(sections[1].content, "- Wrap errors with fmt.Errorf and %w");
    }

    #[test]
    fn short_bullets_dropped() {
        let items = extract_bullet_points("- tiny\n- Wrap errors with fmt.Errorf and %w\n* Use dependency injection everywhere");
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn checklist_items_extracted() {
        let content = "Some intro text.\n\n- [ ] Check error handling patterns\n- [x] Verify naming conventions\n- [ ] short";
        let items = extract_checklist_items(content);
        assert_eq!(
            items,
            vec![
                "Check error handling patterns".to_string(),
                "Verify naming conventions".to_string(),
            ]
        );
    }

    #[test]
    fn routing_by_title_keywords() {
        let content = "## Learned Rules\n- Wrap errors with fmt.Errorf and %w\n\n## Review Checklist\n- [ ] Check error handling patterns\n\n## Folder Structure\nuse internal/\n";
        let loaded = route_sections(content);
        assert_eq!(loaded.rules.len(), 1);
        assert_eq!(loaded.checklist.len(), 1);
        assert!(loaded.codebase_info.contains("Folder Structure"));
    }

    #[test]
    fn header_only_document_yields_nothing() {
        let loaded = route_sections("# PRMate Context\n\nNothing actionable here.\n");
        assert!(loaded.rules.is_empty());
        assert!(loaded.checklist.is_empty());
    }
}
