//! Step D2: heuristic dependency context.
//!
//! Language-specific import scanners turn a changed file's source into a
//! bounded list of candidate repo paths, which are fetched best-effort and
//! embedded in the prompt. These are *hints* for the model, never
//! load-bearing: a missing dependency file is silently skipped.

use std::fmt::Write;

use tracing::debug;

use crate::hosting::HostClient;
use crate::review::ReviewRequest;

const MAX_DEPENDENCY_FILES: usize = 5;
const MAX_DEPENDENCY_CHARS: usize = 3000;

/// Fetches content of files the changed file imports/references and renders
/// them as fenced markdown blocks. Returns an empty string when there is
/// nothing useful.
pub async fn gather_dependency_context(
    host: &HostClient,
    req: &ReviewRequest,
    file_path: &str,
    file_content: &str,
) -> String {
    if file_content.is_empty() {
        return String::new();
    }

    let dependencies = match file_extension(file_path) {
        ".go" => extract_go_imports(file_content, file_path),
        ".ts" | ".tsx" | ".js" | ".jsx" => extract_js_imports(file_content, file_path),
        ".py" => extract_python_imports(file_content, file_path),
        _ => Vec::new(),
    };

    if dependencies.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let mut fetched = 0usize;

    for dep in dependencies {
        if fetched >= MAX_DEPENDENCY_FILES {
            break;
        }

        let content = match host
            .get_file_content(&req.owner, &req.repo, &dep, &req.head_ref)
            .await
        {
            Ok(content) => content,
            // File might not exist or be external.
            Err(_) => continue,
        };

        let content = truncate_for_prompt(&content);
        let _ = write!(out, "\n### {dep}\n```\n{content}\n```\n");
        fetched += 1;
    }

    debug!(file = file_path, deps = fetched, "dependency context gathered");
    out
}

/// Finds local package imports in Go source (`/internal/`, `/pkg/`) and
/// maps them to candidate file paths.
pub fn extract_go_imports(content: &str, current_file: &str) -> Vec<String> {
    let mut deps = Vec::new();
    let mut in_import = false;

    for line in content.lines() {
        let trimmed = line.trim();

        // Single-line imports are almost always stdlib.
        if trimmed.starts_with("import \"") || trimmed.starts_with("import `") {
            continue;
        }

        if trimmed == "import (" {
            in_import = true;
            continue;
        }
        if in_import && trimmed == ")" {
            in_import = false;
            continue;
        }

        if in_import {
            let spec =
                trimmed.trim_matches(|c: char| c == '\t' || c == ' ' || c == '"' || c == '\'' || c == '`');
            if spec.is_empty() || spec.starts_with("//") {
                continue;
            }

            if spec.contains("/internal/") || spec.contains("/pkg/") {
                let parts: Vec<&str> = spec.split('/').collect();
                for (i, part) in parts.iter().enumerate() {
                    if *part == "internal" || *part == "pkg" {
                        let local = parts[i..].join("/");
                        deps.push(format!("{local}.go"));
                        if local.ends_with('/') {
                            deps.push(format!("{local}types.go"));
                        } else {
                            // Package folder: probe the conventional files.
                            deps.push(format!("{local}/types.go"));
                            deps.push(format!("{local}/service.go"));
                        }
                        break;
                    }
                }
            }
        }
    }

    // types.go in the same package often carries the interfaces.
    let dir = parent_dir(current_file);
    if !dir.is_empty() {
        deps.push(format!("{dir}/types.go"));
    }

    deps
}

/// Finds relative imports in JS/TS source and probes common resolutions.
pub fn extract_js_imports(content: &str, current_file: &str) -> Vec<String> {
    let mut deps = Vec::new();
    let dir = parent_dir(current_file);

    for line in content.lines() {
        let trimmed = line.trim();
        if !(trimmed.contains("from '") || trimmed.contains("from \"")) {
            continue;
        }
        let Some(start) = trimmed.find("from ") else {
            continue;
        };
        let module = trimmed[start + 5..].trim_matches(|c: char| c == '\'' || c == '"' || c == ';');

        if module.starts_with("./") || module.starts_with("../") {
            if let Some(resolved) = resolve_relative(dir, module) {
                deps.push(format!("{resolved}.ts"));
                deps.push(format!("{resolved}.tsx"));
                deps.push(format!("{resolved}.js"));
                deps.push(format!("{resolved}/index.ts"));
            }
        }
    }

    deps
}

/// Finds relative `from .module import …` statements in Python source.
pub fn extract_python_imports(content: &str, current_file: &str) -> Vec<String> {
    let mut deps = Vec::new();
    let dir = parent_dir(current_file);

    for line in content.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with("from .") {
            continue;
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        let module = parts[1];
        if module.starts_with('.') {
            let module = module.trim_start_matches('.').replace('.', "/");
            deps.push(format!("{dir}/{module}.py"));
        }
    }

    deps
}

/// Extension including the dot, or "" when the basename has none.
fn file_extension(path: &str) -> &str {
    for (i, b) in path.bytes().enumerate().rev() {
        if b == b'.' {
            return &path[i..];
        }
        if b == b'/' {
            break;
        }
    }
    ""
}

/// Directory part of a slash-separated path ("" for top-level files).
fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

fn resolve_relative(base_dir: &str, relative: &str) -> Option<String> {
    if let Some(rest) = relative.strip_prefix("./") {
        return Some(format!("{base_dir}/{rest}"));
    }
    if let Some(rest) = relative.strip_prefix("../") {
        let parent = parent_dir(base_dir);
        if parent.is_empty() {
            return None;
        }
        return resolve_relative(parent, rest);
    }
    Some(format!("{base_dir}/{relative}"))
}

fn truncate_for_prompt(content: &str) -> String {
    if content.len() <= MAX_DEPENDENCY_CHARS {
        return content.to_string();
    }
    let mut end = MAX_DEPENDENCY_CHARS;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n// ... (truncated)", &content[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_import_block_maps_to_candidate_paths() {
        let src = "package handlers\n\nimport (\n\t\"fmt\"\n\t\"example.com/app/internal/review\"\n)\n";
        let deps = extract_go_imports(src, "internal/handlers/handlers.go");
        assert!(deps.contains(&"internal/review.go".to_string()));
        assert!(deps.contains(&"internal/review/types.go".to_string()));
        assert!(deps.contains(&"internal/review/service.go".to_string()));
        // Same-package probe comes last.
        assert_eq!(deps.last().unwrap(), "internal/handlers/types.go");
    }

    #[test]
    fn go_top_level_file_has_no_same_dir_probe() {
        let deps = extract_go_imports("package main\n", "main.go");
        assert!(deps.is_empty());
    }

    #[test]
    fn js_relative_imports_resolved_with_variants() {
        let src = "import { Thing } from './thing';\nimport x from 'react';\n";
        let deps = extract_js_imports(src, "src/components/App.tsx");
        assert!(deps.contains(&"src/components/thing.ts".to_string()));
        assert!(deps.contains(&"src/components/thing/index.ts".to_string()));
        // Bare module specifiers are not local.
        assert!(!deps.iter().any(|d| d.contains("react")));
    }

    #[test]
    fn js_parent_import_walks_up() {
        let src = "import { api } from '../api/client';\n";
        let deps = extract_js_imports(src, "src/components/App.tsx");
        assert!(deps.contains(&"src/api/client.ts".to_string()));
    }

    #[test]
    fn python_relative_import_resolved() {
        let src = "from .models import Item\nfrom os import path\n";
        let deps = extract_python_imports(src, "app/views.py");
        assert_eq!(deps, vec!["app/models.py".to_string()]);
    }

    #[test]
    fn truncation_appends_marker() {
        let long = "x".repeat(MAX_DEPENDENCY_CHARS + 10);
        let out = truncate_for_prompt(&long);
        assert!(out.ends_with("// ... (truncated)"));
        assert!(out.len() < long.len() + 32);
    }

    #[test]
    fn extension_detection() {
        assert_eq!(file_extension("a/b/c.go"), ".go");
        assert_eq!(file_extension("a/b.d/c"), "");
        assert_eq!(file_extension("Makefile"), "");
    }
}
