//! Multi-repo orchestration: clone external repos, scan them, merge.
//!
//! External repos named by an `@scan` directive are cloned shallowly
//! (depth 1, token-authenticated HTTPS) into deterministic subfolders of a
//! process-scoped temp root; the whole root is removed when the scanner is
//! dropped. A failing external never fails the overall scan; the failure is
//! recorded per repo.
//!
//! Merge semantics: local rules come first, externals are appended with
//! case/whitespace-normalized dedup; analysis merging keeps local fields
//! and only adopts external abstractions/naming patterns with unseen keys.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use git2::{Cred, FetchOptions, RemoteCallbacks};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::analyzer::{AnalysisResult, Analyzer};
use crate::errors::{ScanError, ScanResult};
use crate::instructions::{self, InstructionFile};
use crate::scanner::{CodebaseInventory, Scanner};

/// A repository referenced by a scan.
#[derive(Debug, Clone)]
pub struct RepoSource {
    /// As written in the directive, e.g. "owner/repo".
    pub address: String,
    /// Path of the local clone.
    pub local_path: PathBuf,
    /// Whether the repo ships its own `.prmate.md`.
    pub has_prmate: bool,
    /// Verbatim `.prmate.md` content when present.
    pub prmate_content: Option<String>,
}

/// Everything gathered from one external repo.
#[derive(Debug, Clone)]
pub struct ExternalRepoData {
    pub source: RepoSource,
    pub inventory: Option<CodebaseInventory>,
    pub analysis: Option<AnalysisResult>,
    pub instructions: Vec<InstructionFile>,
    pub error: Option<String>,
}

/// Combined results across the current repo and all externals.
#[derive(Debug, Clone)]
pub struct MultiRepoResult {
    pub current_repo: CodebaseInventory,
    pub current_analysis: AnalysisResult,
    /// Current analysis enriched with externals (local precedence).
    pub merged_analysis: AnalysisResult,
    pub external_repos: Vec<ExternalRepoData>,
    /// De-duplicated rule list, local rules first.
    pub merged_rules: Vec<String>,
}

/// Scans the current repository plus any external repositories.
///
/// Clone targets live under a [`TempDir`] owned by this value; dropping the
/// scanner removes every clone.
pub struct MultiRepoScanner {
    work_dir: TempDir,
    github_token: String,
}

impl MultiRepoScanner {
    pub fn new(github_token: impl Into<String>) -> ScanResult<Self> {
        Ok(Self {
            work_dir: TempDir::with_prefix("prmate-scan-")?,
            github_token: github_token.into(),
        })
    }

    /// Root of the clone workspace (exists for this scanner's lifetime).
    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    /// Shallow-clones a repository into its deterministic subfolder and
    /// returns the clone path. `branch` pins the checkout when given.
    pub async fn clone_repo(&self, address: &str, branch: Option<&str>) -> ScanResult<PathBuf> {
        let normalized = normalize_repo_address(address);
        let target = self.work_dir.path().join(external_clone_dir_name(&normalized)?);
        let url = format!("https://{normalized}.git");

        let token = self.github_token.clone();
        let branch = branch.map(str::to_string);
        let clone_target = target.clone();
        tokio::task::spawn_blocking(move || {
            clone_shallow(&url, &token, &clone_target, branch.as_deref())
        })
        .await??;

        debug!(repo = normalized, path = %target.display(), "clone ready");
        Ok(target)
    }

    /// Scans the current repo and every external, merging rules and
    /// analysis with local precedence.
    pub async fn scan_with_externals(
        &self,
        current_repo_path: &Path,
        external_repos: &[String],
    ) -> ScanResult<MultiRepoResult> {
        let path = current_repo_path.to_path_buf();
        let (current_repo, current_analysis, current_rules) =
            tokio::task::spawn_blocking(move || {
                let inventory = Scanner::new().scan(&path)?;
                let analysis = Analyzer::new().analyze(&inventory);
                let instruction_files = instructions::read_instructions(&path);
                let rules = instructions::extract_rules(&instruction_files);
                Ok::<_, ScanError>((inventory, analysis, rules))
            })
            .await??;

        let mut merged_rules = Vec::new();
        let mut seen = HashSet::new();
        merge_rules(&mut merged_rules, &mut seen, current_rules);

        let mut external_data = Vec::with_capacity(external_repos.len());
        for address in external_repos {
            let data = self.scan_external_repo(address).await;

            if data.error.is_none() {
                let external_rules = instructions::extract_rules(&data.instructions);
                merge_rules(&mut merged_rules, &mut seen, external_rules);
            } else if let Some(err) = &data.error {
                warn!(repo = address, error = err, "external repo skipped");
            }

            external_data.push(data);
        }

        let merged_analysis = merge_analysis_results(
            &current_analysis,
            external_data.iter().filter_map(|d| d.analysis.as_ref()),
        );

        Ok(MultiRepoResult {
            current_repo,
            current_analysis,
            merged_analysis,
            external_repos: external_data,
            merged_rules,
        })
    }

    /// Clones and inspects one external repo; failures are recorded, never
    /// returned.
    async fn scan_external_repo(&self, address: &str) -> ExternalRepoData {
        let mut data = ExternalRepoData {
            source: RepoSource {
                address: address.to_string(),
                local_path: PathBuf::new(),
                has_prmate: false,
                prmate_content: None,
            },
            inventory: None,
            analysis: None,
            instructions: Vec::new(),
            error: None,
        };

        let local_path = match self.clone_repo(address, None).await {
            Ok(path) => path,
            Err(err) => {
                data.error = Some(format!("clone repo: {err}"));
                return data;
            }
        };
        data.source.local_path = local_path.clone();

        let inspected = tokio::task::spawn_blocking(move || {
            let prmate_content = fs::read_to_string(local_path.join(".prmate.md")).ok();
            let instruction_files = instructions::read_instructions(&local_path);

            // A repo with its own rules document is used verbatim;
            // otherwise derive conventions with a full scan.
            let scanned = if prmate_content.is_none() {
                let inventory = Scanner::new().scan(&local_path)?;
                let analysis = Analyzer::new().analyze(&inventory);
                Some((inventory, analysis))
            } else {
                None
            };

            Ok::<_, ScanError>((prmate_content, instruction_files, scanned))
        })
        .await;

        match inspected {
            Ok(Ok((prmate_content, instruction_files, scanned))) => {
                data.source.has_prmate = prmate_content.is_some();
                data.source.prmate_content = prmate_content;
                data.instructions = instruction_files;
                if let Some((inventory, analysis)) = scanned {
                    data.inventory = Some(inventory);
                    data.analysis = Some(analysis);
                }
            }
            Ok(Err(err)) => data.error = Some(format!("scan repo: {err}")),
            Err(err) => data.error = Some(format!("scan repo: {err}")),
        }

        data
    }
}

/// Appends `incoming` rules that are not yet present (case/whitespace
/// normalized).
fn merge_rules(merged: &mut Vec<String>, seen: &mut HashSet<String>, incoming: Vec<String>) {
    for rule in incoming {
        let normalized = rule.trim().to_lowercase();
        if normalized.is_empty() || !seen.insert(normalized) {
            continue;
        }
        merged.push(rule);
    }
}

/// Combines analysis from multiple repos. Current-repo fields take
/// priority; externals only contribute abstractions and naming patterns
/// whose keys are absent locally.
pub fn merge_analysis_results<'a>(
    current: &AnalysisResult,
    externals: impl Iterator<Item = &'a AnalysisResult>,
) -> AnalysisResult {
    let mut merged = current.clone();

    for external in externals {
        for abstraction in &external.abstractions {
            if !merged.abstractions.iter().any(|a| a.name == abstraction.name) {
                merged.abstractions.push(abstraction.clone());
            }
        }

        for pattern in &external.naming_patterns {
            if !merged
                .naming_patterns
                .iter()
                .any(|p| p.pattern == pattern.pattern)
            {
                merged.naming_patterns.push(pattern.clone());
            }
        }
    }

    merged
}

/// Normalizes a repo reference: strip scheme, ensure a `github.com/`
/// prefix, strip a `.git` suffix.
pub fn normalize_repo_address(address: &str) -> String {
    let mut addr = address.trim();
    addr = addr.strip_prefix("https://").unwrap_or(addr);
    addr = addr.strip_prefix("http://").unwrap_or(addr);

    let mut addr = addr.to_string();
    if !addr.starts_with("github.com/") {
        addr = format!("github.com/{addr}");
    }

    addr.strip_suffix(".git").map(str::to_string).unwrap_or(addr)
}

/// Deterministic clone folder: `owner_repo`.
fn external_clone_dir_name(normalized: &str) -> ScanResult<String> {
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [.., owner, repo] => Ok(format!("{owner}_{repo}")),
        _ => Err(ScanError::InvalidRepoAddress(normalized.to_string())),
    }
}

/// Blocking shallow clone with token credentials; any existing target is
/// replaced.
fn clone_shallow(
    url: &str,
    token: &str,
    target: &Path,
    branch: Option<&str>,
) -> Result<(), git2::Error> {
    if target.exists() {
        fs::remove_dir_all(target).map_err(to_git2_err)?;
    }

    let mut callbacks = RemoteCallbacks::new();
    let token = token.to_string();
    callbacks.credentials(move |_url, username, _allowed| {
        let user = if token.is_empty() {
            username.unwrap_or("git").to_string()
        } else {
            token.clone()
        };
        Cred::userpass_plaintext(&user, "")
    });

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    fetch_options.depth(1);

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_options);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    builder.clone(url, target).map(|_| ())
}

/// Converts `std::io::Error` to `git2::Error` for consistent error handling.
fn to_git2_err(e: std::io::Error) -> git2::Error {
    git2::Error::from_str(&format!("io error: {e}"))
}
