//! Filesystem traversal producing a codebase inventory.
//!
//! The walk recurses from the repo root, skipping a built-in denylist of
//! directories (VCS metadata, dependency caches, editor state, build
//! output) and compiled-binary extensions. A `.gitignore` at the root is
//! honored with basename-level glob matching; trailing-slash patterns
//! match directories only. Nested gitignores and negations are not
//! supported.
//!
//! All functions here block on filesystem I/O; async callers wrap the scan
//! in `spawn_blocking`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::errors::ScanResult;

/// A file in the codebase.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    /// Extension including the dot; empty when absent.
    pub extension: String,
    pub size: u64,
    /// Declared package name, extracted for Go sources.
    pub package: Option<String>,
}

/// A folder with its direct contents.
#[derive(Debug, Clone, Default)]
pub struct FolderNode {
    pub path: PathBuf,
    pub name: String,
    pub files: Vec<FileEntry>,
    pub children: Vec<FolderNode>,
    pub depth: usize,
}

/// Everything extracted from one repository scan.
#[derive(Debug, Clone, Default)]
pub struct CodebaseInventory {
    pub root_path: PathBuf,
    pub repo_name: String,
    pub files: Vec<FileEntry>,
    pub folder_tree: FolderNode,
    /// extension -> file count
    pub extensions: HashMap<String, usize>,
    /// Go package name -> file paths
    pub packages: HashMap<String, Vec<PathBuf>>,
    /// depth -> folder paths
    pub folders_by_depth: HashMap<usize, Vec<PathBuf>>,
    /// Immediate children of the root.
    pub top_level_folders: Vec<String>,
    pub ignored_paths: Vec<PathBuf>,
}

const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    ".idea",
    ".vscode",
    "__pycache__",
    ".pytest_cache",
    "dist",
    "build",
    ".next",
    "coverage",
];

const IGNORED_EXTS: &[&str] = &[".exe", ".dll", ".so", ".dylib", ".o", ".a"];

/// Scans a codebase and extracts structure information.
#[derive(Debug, Default)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    /// Scans a repository rooted at `repo_path`.
    pub fn scan(&self, repo_path: &Path) -> ScanResult<CodebaseInventory> {
        let abs = std::path::absolute(repo_path)?;
        let gitignore = GitignoreMatcher::load(&abs);

        let mut inventory = CodebaseInventory {
            root_path: abs.clone(),
            repo_name: abs
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ..Default::default()
        };

        inventory.folder_tree = self.scan_directory(&abs, 0, &gitignore, &mut inventory)?;
        inventory.top_level_folders = inventory
            .folder_tree
            .children
            .iter()
            .map(|c| c.name.clone())
            .collect();

        debug!(
            root = %abs.display(),
            files = inventory.files.len(),
            ignored = inventory.ignored_paths.len(),
            "scan complete"
        );
        Ok(inventory)
    }

    fn scan_directory(
        &self,
        dir_path: &Path,
        depth: usize,
        gitignore: &GitignoreMatcher,
        inventory: &mut CodebaseInventory,
    ) -> ScanResult<FolderNode> {
        let mut folder = FolderNode {
            path: dir_path.to_path_buf(),
            name: dir_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            depth,
            ..Default::default()
        };

        inventory
            .folders_by_depth
            .entry(depth)
            .or_default()
            .push(dir_path.to_path_buf());

        let mut entries: Vec<_> = fs::read_dir(dir_path)?.filter_map(Result::ok).collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let entry_path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

            if should_ignore(&entry_path, is_dir, gitignore) {
                inventory.ignored_paths.push(entry_path);
                continue;
            }

            if is_dir {
                // Unreadable subtrees are skipped, not fatal.
                let Ok(child) = self.scan_directory(&entry_path, depth + 1, gitignore, inventory)
                else {
                    continue;
                };
                folder.children.push(child);
            } else {
                let Ok(meta) = entry.metadata() else { continue };
                let file = extract_file_entry(&entry_path, meta.len());

                if !file.extension.is_empty() {
                    *inventory
                        .extensions
                        .entry(file.extension.clone())
                        .or_default() += 1;
                }
                if let Some(pkg) = &file.package {
                    inventory
                        .packages
                        .entry(pkg.clone())
                        .or_default()
                        .push(entry_path.clone());
                }

                inventory.files.push(file.clone());
                folder.files.push(file);
            }
        }

        Ok(folder)
    }
}

fn should_ignore(path: &Path, is_dir: bool, gitignore: &GitignoreMatcher) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if is_dir && IGNORED_DIRS.contains(&name.as_str()) {
        return true;
    }

    let ext = extension_of(&name);
    if IGNORED_EXTS.contains(&ext) {
        return true;
    }

    gitignore.matches(&name, is_dir)
}

fn extract_file_entry(path: &Path, size: u64) -> FileEntry {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = extension_of(&name).to_string();

    let package = if extension == ".go" {
        extract_go_package(path)
    } else {
        None
    };

    FileEntry {
        path: path.to_path_buf(),
        name,
        extension,
        size,
        package,
    }
}

/// Extension including the dot, or "" when the name has none.
fn extension_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => "",
        Some(i) => &name[i..],
    }
}

/// First `package X` declaration of a Go source file.
fn extract_go_package(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("package ") {
            return rest.split_whitespace().next().map(str::to_string);
        }
    }
    None
}

/// Root `.gitignore` patterns, matched against basenames only.
#[derive(Debug, Default)]
struct GitignoreMatcher {
    dir_only: Option<GlobSet>,
    any: Option<GlobSet>,
}

impl GitignoreMatcher {
    fn load(repo_path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(repo_path.join(".gitignore")) else {
            return Self::default();
        };

        let mut dir_builder = GlobSetBuilder::new();
        let mut any_builder = GlobSetBuilder::new();

        for line in content.lines() {
            let pattern = line.trim();
            if pattern.is_empty() || pattern.starts_with('#') {
                continue;
            }

            let (target, pattern) = match pattern.strip_suffix('/') {
                Some(dir_pattern) => (&mut dir_builder, dir_pattern),
                None => (&mut any_builder, pattern),
            };
            // Unparseable patterns are ignored.
            if let Ok(glob) = Glob::new(pattern) {
                target.add(glob);
            }
        }

        Self {
            dir_only: dir_builder.build().ok(),
            any: any_builder.build().ok(),
        }
    }

    fn matches(&self, name: &str, is_dir: bool) -> bool {
        if is_dir {
            if let Some(set) = &self.dir_only {
                if set.is_match(name) {
                    return true;
                }
            }
        }
        self.any.as_ref().is_some_and(|set| set.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn inventory_captures_tree_and_aggregates() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "main.go", "package main\n");
        write(root, "internal/review/service.go", "package review\n");
        write(root, "internal/review/service_test.go", "package review\n");
        write(root, "docs/readme.md", "# hi\n");

        let inv = Scanner::new().scan(root).unwrap();

        assert_eq!(inv.files.len(), 4);
        assert_eq!(inv.extensions[".go"], 3);
        assert_eq!(inv.extensions[".md"], 1);
        assert!(inv.packages["review"].len() == 2);
        assert!(inv.top_level_folders.contains(&"internal".to_string()));
        assert!(inv.top_level_folders.contains(&"docs".to_string()));
        // internal/review sits at depth 2.
        assert!(inv.folders_by_depth[&2]
            .iter()
            .any(|p| p.ends_with("internal/review")));
    }

    #[test]
    fn denylisted_dirs_and_binary_exts_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "node_modules/pkg/index.js", "x");
        write(root, ".git/config", "x");
        write(root, "app.so", "x");
        write(root, "main.go", "package main\n");

        let inv = Scanner::new().scan(root).unwrap();

        assert_eq!(inv.files.len(), 1);
        assert_eq!(inv.files[0].name, "main.go");
        assert_eq!(inv.ignored_paths.len(), 3);
    }

    #[test]
    fn gitignore_basename_globs_applied() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, ".gitignore", "*.log\ntarget/\n# comment\n");
        write(root, "debug.log", "x");
        write(root, "target/out.txt", "x");
        write(root, "target.txt", "x");
        write(root, "main.go", "package main\n");

        let inv = Scanner::new().scan(root).unwrap();

        let names: Vec<_> = inv.files.iter().map(|f| f.name.as_str()).collect();
        assert!(!names.contains(&"debug.log"));
        assert!(!names.contains(&"out.txt"));
        // `target/` is a directory pattern; the plain file survives.
        assert!(names.contains(&"target.txt"));
        assert!(names.contains(&"main.go"));
    }

    #[test]
    fn go_package_tag_extracted() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "svc.go", "// comment\npackage handlers\n\nfunc X() {}\n");

        let inv = Scanner::new().scan(root).unwrap();
        assert_eq!(inv.files[0].package.as_deref(), Some("handlers"));
    }
}
