use crate::constants::{DEFAULT_BASE_BRANCH, DEFAULT_BASE_DIR_NAME, TASK_BRANCH_PREFIX};
use crate::error::{GroveError, Result};
use crate::git::{
    WorktreeList, ensure_repository, list_git_worktrees, worktree_add_existing_branch,
    worktree_add_new_branch, worktree_prune, worktree_remove,
};
use crate::process::best_error_line;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Creates, enumerates, and destroys named git worktrees under one base
/// directory, keeping an in-memory registry from logical name to path.
///
/// Each worktree is bound to its own branch (`task/{name}` by default), so
/// concurrent tasks can work on disjoint checkouts of one repository.
/// Registry mutations are serialized internally; the manager may be shared
/// across threads behind `Arc`. Concurrent create/remove calls for the
/// *same* name still race against git's own worktree locking and must be
/// serialized by the caller.
#[derive(Debug)]
pub struct WorktreeManager {
    repo_root: PathBuf,
    base_dir: PathBuf,
    registry: Mutex<HashMap<String, PathBuf>>,
}

impl WorktreeManager {
    /// Opens `repo_path` with worktrees rooted in a sibling `worktrees/`
    /// directory next to the repository.
    pub fn new(repo_path: impl AsRef<Path>) -> Result<Self> {
        Self::open(repo_path.as_ref(), None)
    }

    /// Opens `repo_path` with worktrees rooted at an explicit `base_dir`
    /// instead of the sibling default.
    pub fn with_base_dir(repo_path: impl AsRef<Path>, base_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open(repo_path.as_ref(), Some(base_dir.into()))
    }

    fn open(repo_path: &Path, base_dir: Option<PathBuf>) -> Result<Self> {
        let repo_root = fs::canonicalize(repo_path).map_err(|err| GroveError::NotARepository {
            path: repo_path.to_path_buf(),
            details: err.to_string(),
        })?;
        ensure_repository(&repo_root)?;

        let base_dir = base_dir.unwrap_or_else(|| {
            repo_root
                .parent()
                .map(|parent| parent.join(DEFAULT_BASE_DIR_NAME))
                .unwrap_or_else(|| repo_root.join(DEFAULT_BASE_DIR_NAME))
        });

        Ok(Self {
            repo_root,
            base_dir,
            registry: Mutex::new(HashMap::new()),
        })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// The directory all managed worktrees live under. Created lazily on
    /// first creation, never at construction.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Creates a worktree named `name` on a fresh `task/{name}` branch
    /// forked from `main`. See [`create_worktree_with`] for the full form.
    ///
    /// [`create_worktree_with`]: Self::create_worktree_with
    pub fn create_worktree(&self, name: &str) -> Result<PathBuf> {
        self.create_worktree_with(name, None, DEFAULT_BASE_BRANCH)
    }

    /// Creates a worktree at `base_dir/name`, checked out on `branch`
    /// (default `task/{name}`) forked from `base_branch`.
    ///
    /// Recreating an existing name removes the old worktree first, so the
    /// result is always a fresh checkout at the same path. If branch
    /// creation fails (typically because the branch survives from an
    /// earlier run), the existing branch is checked out instead; only when
    /// both attempts fail does this return `WorktreeCreation` with git's
    /// diagnostic text.
    pub fn create_worktree_with(
        &self,
        name: &str,
        branch: Option<&str>,
        base_branch: &str,
    ) -> Result<PathBuf> {
        validate_worktree_name(name)?;
        let branch = match branch {
            Some(branch) => branch.to_string(),
            None => format!("{TASK_BRANCH_PREFIX}{name}"),
        };
        let path = self.base_dir.join(name);

        fs::create_dir_all(&self.base_dir).map_err(|err| GroveError::WorktreeCreation {
            name: name.to_string(),
            details: format!("failed to create {}: {err}", self.base_dir.display()),
        })?;

        if path.exists() {
            log::debug!("recreating worktree `{name}` at {}", path.display());
            self.remove_worktree(name, true)?;
        }

        let added = worktree_add_new_branch(&self.repo_root, &path, &branch, base_branch)?;
        if !added.status.success() {
            // Most commonly the branch already exists; check it out as-is.
            let fallback = worktree_add_existing_branch(&self.repo_root, &path, &branch)?;
            if !fallback.status.success() {
                return Err(GroveError::WorktreeCreation {
                    name: name.to_string(),
                    details: best_error_line(&fallback.stderr),
                });
            }
            log::debug!("worktree `{name}` reuses existing branch `{branch}`");
        }

        log::debug!(
            "created worktree `{name}` at {} on branch `{branch}`",
            path.display()
        );
        self.registry().insert(name.to_string(), path.clone());
        Ok(path)
    }

    /// Ground truth from `git worktree list --porcelain`: every worktree
    /// git tracks for this repository, not just ones created through this
    /// manager instance.
    pub fn list_worktrees(&self) -> Result<WorktreeList> {
        list_git_worktrees(&self.repo_root)
    }

    /// Removes the worktree registered under `name`, or the one at the
    /// conventional `base_dir/name` path when the registry has no entry
    /// (e.g. it was created by an earlier process). A path that is already
    /// gone from disk is a silent no-op.
    ///
    /// When git cannot remove the worktree cleanly, the directory tree is
    /// deleted directly and git's stale bookkeeping is pruned best-effort;
    /// only a failure of the direct deletion propagates. The registry
    /// entry is dropped in every case.
    pub fn remove_worktree(&self, name: &str, force: bool) -> Result<()> {
        let path = self
            .registry()
            .remove(name)
            .unwrap_or_else(|| self.base_dir.join(name));

        if !path.exists() {
            return Ok(());
        }

        match worktree_remove(&self.repo_root, &path, force) {
            Ok(output) if output.status.success() => {
                log::debug!("removed worktree `{name}` at {}", path.display());
                return Ok(());
            }
            Ok(output) => {
                log::warn!(
                    "git worktree remove failed for {}: {}",
                    path.display(),
                    best_error_line(&output.stderr)
                );
            }
            Err(err) => {
                log::warn!("failed to run git worktree remove for {}: {err}", path.display());
            }
        }

        // Contract of removal is "the directory is gone", even when git's
        // administrative state cannot be updated cleanly.
        fs::remove_dir_all(&path).map_err(|source| GroveError::Removal {
            path: path.clone(),
            source,
        })?;
        worktree_prune(&self.repo_root);
        log::debug!("force-deleted worktree `{name}` at {}", path.display());
        Ok(())
    }

    /// Removes every worktree this instance's registry remembers. Worktrees
    /// tracked by git but unknown to this process are left alone; use
    /// [`list_worktrees`] to discover those.
    ///
    /// [`list_worktrees`]: Self::list_worktrees
    pub fn cleanup_all(&self) -> Result<()> {
        let names: Vec<String> = self.registry().keys().cloned().collect();
        let mut first_failure = None;
        for name in names {
            if let Err(err) = self.remove_worktree(&name, true) {
                log::warn!("cleanup of worktree `{name}` failed: {err}");
                first_failure.get_or_insert(err);
            }
        }
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Registry lookup by name. `None` when this instance never created
    /// `name` (or already removed it); never fails.
    pub fn worktree_path(&self, name: &str) -> Option<PathBuf> {
        self.registry().get(name).cloned()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, PathBuf>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn validate_worktree_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(GroveError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.trim().is_empty() {
        return invalid("name must not be empty");
    }
    if name == "." || name == ".." {
        return invalid("name must be a real directory name");
    }
    if name.contains('/') || name.contains('\\') {
        return invalid("name must not contain path separators");
    }
    Ok(())
}
