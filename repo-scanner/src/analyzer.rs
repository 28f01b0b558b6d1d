//! Convention analysis over a codebase inventory.
//!
//! Pure derivations (no network): dominant naming styles, recognized folder
//! layouts, abstraction suffixes, error-handling patterns, and test
//! placement. Content-based checks read files from disk and ignore
//! per-file read failures.

use std::fs;
use std::path::PathBuf;

use regex::Regex;

use crate::scanner::CodebaseInventory;

/// Detected naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStyle {
    Camel,
    Pascal,
    Snake,
    Kebab,
    #[default]
    Mixed,
}

impl NamingStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            NamingStyle::Camel => "camelCase",
            NamingStyle::Pascal => "PascalCase",
            NamingStyle::Snake => "snake_case",
            NamingStyle::Kebab => "kebab-case",
            NamingStyle::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for NamingStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected pattern with examples.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub pattern: String,
    pub examples: Vec<String>,
    pub count: usize,
}

/// An abstraction layer in the codebase.
#[derive(Debug, Clone)]
pub struct AbstractionInfo {
    /// e.g. "Service", "Handler", "Interface"
    pub name: String,
    pub suffix: String,
    /// e.g. "I" for interfaces; unused by the current detectors.
    pub prefix: String,
    pub locations: Vec<PathBuf>,
    pub is_interface: bool,
}

/// A recognized folder-structure convention.
#[derive(Debug, Clone)]
pub struct FolderConvention {
    /// e.g. "internal/{domain}/"
    pub pattern: String,
    pub purpose: String,
    pub examples: Vec<String>,
    pub depth: usize,
}

/// Error-handling bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStyle {
    Wrap,
    Raw,
    Custom,
}

impl ErrorStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorStyle::Wrap => "wrap",
            ErrorStyle::Raw => "raw",
            ErrorStyle::Custom => "custom",
        }
    }
}

/// Tally of one error-handling bucket with example locations.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    pub style: ErrorStyle,
    pub examples: Vec<PathBuf>,
    pub count: usize,
}

/// How tests are organized.
#[derive(Debug, Clone, Default)]
pub struct TestConvention {
    /// Tests live next to their sources.
    pub colocated: bool,
    /// Tests live in a separate folder.
    pub separate_folder: bool,
    pub test_suffix: String,
    pub examples: Vec<PathBuf>,
}

/// All detected conventions for one codebase.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub folder_naming: NamingStyle,
    pub file_naming: NamingStyle,
    pub folder_conventions: Vec<FolderConvention>,
    pub abstractions: Vec<AbstractionInfo>,
    pub naming_patterns: Vec<PatternMatch>,
    pub error_patterns: Vec<ErrorPattern>,
    pub test_conventions: TestConvention,
    pub import_patterns: Vec<String>,
}

const ABSTRACTION_SUFFIXES: &[&str] = &[
    "Service",
    "Handler",
    "Repository",
    "Client",
    "Manager",
    "Controller",
    "Provider",
];

const NAMING_SUFFIXES: &[&str] = &[
    "_test",
    "Service",
    "Handler",
    "Repository",
    "Client",
    "Manager",
];

const MAX_PATTERN_EXAMPLES: usize = 3;

/// Extracts conventions from a [`CodebaseInventory`].
#[derive(Debug, Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    /// Runs every derivation over the inventory.
    pub fn analyze(&self, inventory: &CodebaseInventory) -> AnalysisResult {
        AnalysisResult {
            folder_naming: dominant_style(
                inventory.top_level_folders.iter().map(|f| detect_naming_style(f)),
            ),
            file_naming: dominant_style(inventory.files.iter().map(|f| {
                detect_naming_style(f.name.strip_suffix(&f.extension).unwrap_or(&f.name))
            })),
            folder_conventions: detect_folder_conventions(inventory),
            abstractions: detect_abstractions(inventory),
            naming_patterns: detect_naming_patterns(inventory),
            error_patterns: detect_error_patterns(inventory),
            test_conventions: detect_test_conventions(inventory),
            import_patterns: Vec::new(),
        }
    }
}

/// Per-name classifier: separators first, then leading-case.
pub fn detect_naming_style(name: &str) -> NamingStyle {
    if name.contains('-') {
        return NamingStyle::Kebab;
    }
    if name.contains('_') {
        return NamingStyle::Snake;
    }
    match name.chars().next() {
        Some(c) if c.is_ascii_uppercase() => NamingStyle::Pascal,
        Some(c) if c.is_ascii_lowercase() => NamingStyle::Camel,
        _ => NamingStyle::Mixed,
    }
}

/// Majority vote; ties resolve to the first style seen.
fn dominant_style(styles: impl Iterator<Item = NamingStyle>) -> NamingStyle {
    let mut counts: Vec<(NamingStyle, usize)> = Vec::new();
    for style in styles {
        match counts.iter().position(|(s, _)| *s == style) {
            Some(i) => counts[i].1 += 1,
            None => counts.push((style, 1)),
        }
    }

    let mut best = NamingStyle::Mixed;
    let mut best_count = 0;
    for (style, count) in counts {
        if count > best_count {
            best = style;
            best_count = count;
        }
    }
    best
}

fn detect_folder_conventions(inventory: &CodebaseInventory) -> Vec<FolderConvention> {
    let mut conventions = Vec::new();

    for folder in &inventory.top_level_folders {
        match folder.as_str() {
            "internal" => conventions.push(FolderConvention {
                pattern: "internal/{domain}/".into(),
                purpose: "Private application code organized by domain".into(),
                examples: find_subfolders(inventory, "internal"),
                depth: 1,
            }),
            "pkg" => conventions.push(FolderConvention {
                pattern: "pkg/{library}/".into(),
                purpose: "Public reusable packages".into(),
                examples: find_subfolders(inventory, "pkg"),
                depth: 1,
            }),
            "cmd" => conventions.push(FolderConvention {
                pattern: "cmd/{app}/".into(),
                purpose: "Application entry points".into(),
                examples: find_subfolders(inventory, "cmd"),
                depth: 1,
            }),
            "api" => conventions.push(FolderConvention {
                pattern: "api/".into(),
                purpose: "API definitions (OpenAPI, protobuf)".into(),
                examples: vec![folder.clone()],
                depth: 1,
            }),
            "configs" | "config" => conventions.push(FolderConvention {
                pattern: format!("{folder}/"),
                purpose: "Configuration files".into(),
                examples: vec![folder.clone()],
                depth: 1,
            }),
            _ => {}
        }
    }

    conventions
}

/// Immediate children of a top-level folder (depth 2 in the tree).
fn find_subfolders(inventory: &CodebaseInventory, parent: &str) -> Vec<String> {
    let prefix = inventory.root_path.join(parent);
    inventory
        .folders_by_depth
        .get(&2)
        .map(|folders| {
            folders
                .iter()
                .filter(|f| f.starts_with(&prefix))
                .filter_map(|f| f.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn detect_abstractions(inventory: &CodebaseInventory) -> Vec<AbstractionInfo> {
    let mut abstractions: Vec<AbstractionInfo> = Vec::new();

    for file in &inventory.files {
        if file.extension != ".go" {
            continue;
        }

        let stem = file.name.strip_suffix(&file.extension).unwrap_or(&file.name);

        for suffix in ABSTRACTION_SUFFIXES {
            if stem.ends_with(suffix) || stem.to_lowercase().ends_with(&suffix.to_lowercase()) {
                record_abstraction(
                    &mut abstractions,
                    AbstractionInfo {
                        name: (*suffix).to_string(),
                        suffix: (*suffix).to_string(),
                        prefix: String::new(),
                        locations: Vec::new(),
                        is_interface: false,
                    },
                    &file.path,
                );
            }
        }

        // Interface declarations are a content-level signal.
        if let Ok(content) = fs::read_to_string(&file.path) {
            if content.contains("type ") && content.contains(" interface {") {
                record_abstraction(
                    &mut abstractions,
                    AbstractionInfo {
                        name: "Interface".to_string(),
                        suffix: String::new(),
                        prefix: String::new(),
                        locations: Vec::new(),
                        is_interface: true,
                    },
                    &file.path,
                );
            }
        }
    }

    abstractions
}

/// Appends `path` to the abstraction named like `entry`, inserting the
/// entry on first sight.
fn record_abstraction(
    abstractions: &mut Vec<AbstractionInfo>,
    entry: AbstractionInfo,
    path: &std::path::Path,
) {
    match abstractions
        .iter()
        .position(|a| a.name.eq_ignore_ascii_case(&entry.name))
    {
        Some(i) => abstractions[i].locations.push(path.to_path_buf()),
        None => {
            let mut entry = entry;
            entry.locations.push(path.to_path_buf());
            abstractions.push(entry);
        }
    }
}

fn detect_naming_patterns(inventory: &CodebaseInventory) -> Vec<PatternMatch> {
    let mut patterns: Vec<PatternMatch> = Vec::new();

    for file in &inventory.files {
        if file.extension != ".go" {
            continue;
        }
        let stem = file.name.strip_suffix(&file.extension).unwrap_or(&file.name);

        for suffix in NAMING_SUFFIXES {
            if stem.ends_with(suffix) {
                let key = format!("*{suffix}");
                match patterns.iter().position(|p| p.pattern == key) {
                    Some(i) => {
                        patterns[i].count += 1;
                        patterns[i].examples.push(stem.to_string());
                    }
                    None => patterns.push(PatternMatch {
                        pattern: key,
                        examples: vec![stem.to_string()],
                        count: 1,
                    }),
                }
            }
        }
    }

    patterns
}

fn detect_error_patterns(inventory: &CodebaseInventory) -> Vec<ErrorPattern> {
    let wrap_re = Regex::new(r"fmt\.Errorf\([^)]*%w").unwrap();
    let raw_re = Regex::new(r"(?m)return\s+err\s*$").unwrap();

    let mut wrap: Option<ErrorPattern> = None;
    let mut raw: Option<ErrorPattern> = None;

    for file in &inventory.files {
        if file.extension != ".go" {
            continue;
        }
        let Ok(content) = fs::read_to_string(&file.path) else {
            continue;
        };

        if wrap_re.is_match(&content) {
            let entry = wrap.get_or_insert_with(|| ErrorPattern {
                style: ErrorStyle::Wrap,
                examples: Vec::new(),
                count: 0,
            });
            entry.count += 1;
            if entry.examples.len() < MAX_PATTERN_EXAMPLES {
                entry.examples.push(file.path.clone());
            }
        }

        if raw_re.is_match(&content) {
            let entry = raw.get_or_insert_with(|| ErrorPattern {
                style: ErrorStyle::Raw,
                examples: Vec::new(),
                count: 0,
            });
            entry.count += 1;
            if entry.examples.len() < MAX_PATTERN_EXAMPLES {
                entry.examples.push(file.path.clone());
            }
        }
    }

    [wrap, raw].into_iter().flatten().collect()
}

fn detect_test_conventions(inventory: &CodebaseInventory) -> TestConvention {
    let mut convention = TestConvention {
        test_suffix: "_test.go".into(),
        ..Default::default()
    };

    let mut test_files: Vec<PathBuf> = Vec::new();
    let mut source_dirs: Vec<PathBuf> = Vec::new();

    for file in &inventory.files {
        if file.extension != ".go" {
            continue;
        }
        if file.name.ends_with("_test.go") {
            test_files.push(file.path.clone());
        } else if let Some(dir) = file.path.parent() {
            source_dirs.push(dir.to_path_buf());
        }
    }

    let mut colocated = 0usize;
    let mut separate = 0usize;
    for test_path in &test_files {
        let in_source_dir = test_path
            .parent()
            .is_some_and(|dir| source_dirs.iter().any(|d| d == dir));
        if in_source_dir {
            colocated += 1;
        } else {
            separate += 1;
        }

        if convention.examples.len() < MAX_PATTERN_EXAMPLES {
            convention.examples.push(test_path.clone());
        }
    }

    convention.colocated = colocated > separate;
    convention.separate_folder = separate > colocated;
    convention
}
