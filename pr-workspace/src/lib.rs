//! Per-PR scratch workspace lifecycle.
//!
//! Every pull request gets an on-disk working directory at
//! `<base>/<owner>/<repo>/pr-<N>`. A sentinel file (`.prmate-workdir`)
//! marks directories this crate created; deletion refuses to touch anything
//! without the sentinel, anything outside the base directory after symlink
//! resolution, and the base directory itself.
//!
//! Ensure/Delete for the same PR are serialized by a per-`owner/repo#pr`
//! async lock; the lock registry itself is guarded by a coarser mutex.

pub mod errors;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::errors::{WorkspaceError, WorkspaceResult};

/// Marker file whose presence authorizes destructive operations.
pub const SENTINEL_FILE: &str = ".prmate-workdir";

/// Manages per-PR working directories under a single base directory.
pub struct Manager {
    base_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Manager {
    /// Creates a manager rooted at `base_dir`. The directory is validated
    /// lazily on first use, not here.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates (if needed) the workspace for `repo_full_name` + `pr_number`
    /// and returns its path. Idempotent; the sentinel file is created once.
    pub async fn ensure(&self, repo_full_name: &str, pr_number: i64) -> WorkspaceResult<PathBuf> {
        if pr_number <= 0 {
            return Err(WorkspaceError::InvalidPrNumber(pr_number));
        }

        let (pr_dir, key) = self.pr_dir_path(repo_full_name, pr_number)?;
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        fs::create_dir_all(&pr_dir).await?;
        write_sentinel_if_missing(&pr_dir.join(SENTINEL_FILE)).await?;

        debug!(dir = %pr_dir.display(), "pr workspace ready");
        Ok(pr_dir)
    }

    /// Deletes the workspace for `repo_full_name` + `pr_number`.
    ///
    /// Succeeds when the directory is already gone. Refuses (with a typed
    /// error) when the sentinel is missing or the resolved target is not
    /// strictly inside the resolved base directory.
    pub async fn delete(&self, repo_full_name: &str, pr_number: i64) -> WorkspaceResult<()> {
        if pr_number <= 0 {
            return Err(WorkspaceError::InvalidPrNumber(pr_number));
        }

        let (pr_dir, key) = self.pr_dir_path(repo_full_name, pr_number)?;
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        match fs::metadata(&pr_dir).await {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        self.validate_safe_delete(&pr_dir).await?;

        match fs::metadata(pr_dir.join(SENTINEL_FILE)).await {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(WorkspaceError::MissingSentinel {
                    dir: pr_dir.display().to_string(),
                    sentinel: SENTINEL_FILE,
                });
            }
            Err(err) => return Err(err.into()),
        }

        fs::remove_dir_all(&pr_dir).await?;
        debug!(dir = %pr_dir.display(), "pr workspace deleted");
        Ok(())
    }

    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn pr_dir_path(
        &self,
        repo_full_name: &str,
        pr_number: i64,
    ) -> WorkspaceResult<(PathBuf, String)> {
        let base = normalize_base_dir(&self.base_dir)?;
        let (owner, repo) = sanitize_repo_full_name(repo_full_name)?;

        let key = format!("{owner}/{repo}#{pr_number}");
        let dir = base.join(owner).join(repo).join(format!("pr-{pr_number}"));
        Ok((dir, key))
    }

    /// Symlink-resolving containment check. The target must exist, differ
    /// from the base, and sit strictly inside it.
    async fn validate_safe_delete(&self, target: &Path) -> WorkspaceResult<()> {
        let base = normalize_base_dir(&self.base_dir)?;
        let base_real = fs::canonicalize(&base).await?;

        let target_real = match fs::canonicalize(target).await {
            Ok(p) => p,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        if target_real == base_real {
            return Err(WorkspaceError::TargetIsBaseDir(
                base_real.display().to_string(),
            ));
        }

        match target_real.strip_prefix(&base_real) {
            Ok(rel) if !rel.as_os_str().is_empty() => Ok(()),
            _ => Err(WorkspaceError::OutsideBaseDir {
                target: target_real.display().to_string(),
                base: base_real.display().to_string(),
            }),
        }
    }
}

fn normalize_base_dir(base_dir: &Path) -> WorkspaceResult<PathBuf> {
    if base_dir.as_os_str().is_empty()
        || base_dir.to_string_lossy().trim().is_empty()
    {
        return Err(WorkspaceError::EmptyBaseDir);
    }

    let abs = std::path::absolute(base_dir)?;
    if abs.parent().is_none() {
        return Err(WorkspaceError::BaseDirIsRoot);
    }

    Ok(abs)
}

fn sanitize_repo_full_name(repo_full_name: &str) -> WorkspaceResult<(String, String)> {
    let trimmed = repo_full_name.trim();
    let mut parts = trimmed.split('/');
    let (owner, repo) = match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) => (owner, repo),
        _ => return Err(WorkspaceError::InvalidRepoName(repo_full_name.to_string())),
    };

    let owner = sanitize_path_segment(owner);
    let repo = sanitize_path_segment(repo);
    for seg in [&owner, &repo] {
        if seg.is_empty() || seg == "." || seg == ".." {
            return Err(WorkspaceError::InvalidRepoName(repo_full_name.to_string()));
        }
    }

    Ok((owner, repo))
}

/// Folds every byte outside `[A-Za-z0-9._-]` to `_` and trims leading and
/// trailing underscores.
fn sanitize_path_segment(seg: &str) -> String {
    let folded: String = seg
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();
    folded.trim_matches('_').to_string()
}

async fn write_sentinel_if_missing(path: &Path) -> WorkspaceResult<()> {
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(tmp: &TempDir) -> Manager {
        Manager::new(tmp.path())
    }

    #[tokio::test]
    async fn ensure_creates_dir_and_sentinel() {
        let tmp = TempDir::new().unwrap();
        let m = manager(&tmp);

        let dir = m.ensure("octo/widgets", 42).await.unwrap();
        assert!(dir.ends_with("octo/widgets/pr-42"));
        assert!(dir.join(SENTINEL_FILE).exists());

        // Second call is a no-op.
        let again = m.ensure("octo/widgets", 42).await.unwrap();
        assert_eq!(dir, again);
    }

    #[tokio::test]
    async fn delete_after_ensure_leaves_no_residue() {
        let tmp = TempDir::new().unwrap();
        let m = manager(&tmp);

        let dir = m.ensure("octo/widgets", 7).await.unwrap();
        m.delete("octo/widgets", 7).await.unwrap();
        assert!(!dir.exists());
        assert!(tmp.path().exists());
    }

    #[tokio::test]
    async fn delete_missing_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let m = manager(&tmp);
        m.delete("octo/widgets", 1).await.unwrap();
    }

    #[tokio::test]
    async fn delete_refuses_without_sentinel() {
        let tmp = TempDir::new().unwrap();
        let m = manager(&tmp);

        let dir = m.ensure("octo/widgets", 3).await.unwrap();
        std::fs::remove_file(dir.join(SENTINEL_FILE)).unwrap();

        let err = m.delete("octo/widgets", 3).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::MissingSentinel { .. }));
        assert!(dir.exists());
    }

    #[tokio::test]
    async fn invalid_pr_number_rejected() {
        let tmp = TempDir::new().unwrap();
        let m = manager(&tmp);

        assert!(matches!(
            m.ensure("octo/widgets", 0).await.unwrap_err(),
            WorkspaceError::InvalidPrNumber(0)
        ));
        assert!(matches!(
            m.delete("octo/widgets", -4).await.unwrap_err(),
            WorkspaceError::InvalidPrNumber(-4)
        ));
    }

    #[tokio::test]
    async fn invalid_repo_names_rejected() {
        let tmp = TempDir::new().unwrap();
        let m = manager(&tmp);

        for name in ["", "nofslash", "a/b/c", "../x", "owner/..", "owner/"] {
            assert!(
                m.ensure(name, 1).await.is_err(),
                "expected rejection for {name:?}"
            );
        }
    }

    #[tokio::test]
    async fn empty_base_dir_rejected() {
        let m = Manager::new("");
        assert!(matches!(
            m.ensure("octo/widgets", 1).await.unwrap_err(),
            WorkspaceError::EmptyBaseDir
        ));
    }

    #[test]
    fn sanitize_folds_and_trims() {
        assert_eq!(sanitize_path_segment("octo cat"), "octo_cat");
        assert_eq!(sanitize_path_segment("_weird_"), "weird");
        assert_eq!(sanitize_path_segment("a\\b"), "a_b");
        assert_eq!(sanitize_path_segment("ok-name.v2"), "ok-name.v2");
    }
}
