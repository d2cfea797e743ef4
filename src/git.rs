use crate::error::{GroveError, Result};
use crate::process::{CmdOutput, best_error_line, path_to_str, run_capture};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Succeeds iff `path` is inside a recognized git working copy. Failure
/// carries git's own diagnostic so the caller sees why validation failed.
pub(crate) fn ensure_repository(path: &Path) -> Result<()> {
    let output = run_capture("git", &["rev-parse", "--git-dir"], Some(path))?;
    if !output.status.success() {
        return Err(GroveError::NotARepository {
            path: path.to_path_buf(),
            details: best_error_line(&output.stderr),
        });
    }
    Ok(())
}

/// `git worktree add -b <branch> <path> <base>` — new branch forked from
/// `base_branch`, checked out at `path`.
pub(crate) fn worktree_add_new_branch(
    repo_root: &Path,
    path: &Path,
    branch: &str,
    base_branch: &str,
) -> Result<CmdOutput> {
    let path = path_to_str(path)?;
    run_capture(
        "git",
        &["worktree", "add", "-b", branch, path, base_branch],
        Some(repo_root),
    )
}

/// `git worktree add <path> <branch>` — checks out an already-existing
/// branch. Used when branch creation fails because the branch survives
/// from an earlier run.
pub(crate) fn worktree_add_existing_branch(
    repo_root: &Path,
    path: &Path,
    branch: &str,
) -> Result<CmdOutput> {
    let path = path_to_str(path)?;
    run_capture("git", &["worktree", "add", path, branch], Some(repo_root))
}

pub(crate) fn worktree_remove(repo_root: &Path, path: &Path, force: bool) -> Result<CmdOutput> {
    let path = path_to_str(path)?;
    let mut args = vec!["worktree", "remove"];
    if force {
        args.push("--force");
    }
    args.push(path);
    run_capture("git", &args, Some(repo_root))
}

/// Best-effort cleanup of stale administrative entries, e.g. after a
/// worktree directory was deleted behind git's back.
pub(crate) fn worktree_prune(repo_root: &Path) {
    match run_capture("git", &["worktree", "prune"], Some(repo_root)) {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            log::warn!(
                "git worktree prune failed: {}",
                best_error_line(&output.stderr)
            );
        }
        Err(err) => log::warn!("failed to run git worktree prune: {err}"),
    }
}

/// One record from `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub head: Option<String>,
}

/// The porcelain listing for a repository. Holds the raw output; records
/// are decoded lazily and the iteration can be restarted at will.
#[derive(Debug, Clone)]
pub struct WorktreeList {
    raw: String,
}

impl WorktreeList {
    pub fn iter(&self) -> WorktreeEntries<'_> {
        parse_worktree_porcelain(&self.raw)
    }
}

impl<'a> IntoIterator for &'a WorktreeList {
    type Item = WorktreeInfo;
    type IntoIter = WorktreeEntries<'a>;

    fn into_iter(self) -> WorktreeEntries<'a> {
        self.iter()
    }
}

pub(crate) fn list_git_worktrees(repo_root: &Path) -> Result<WorktreeList> {
    let output = run_capture("git", &["worktree", "list", "--porcelain"], Some(repo_root))?;
    if !output.status.success() {
        return Err(GroveError::VcsQuery {
            details: best_error_line(&output.stderr),
        });
    }
    Ok(WorktreeList { raw: output.stdout })
}

/// Lazily decodes porcelain output: each record starts at a
/// `worktree <path>` line and ends at a blank line, the next `worktree`
/// line, or end of input. Attribute lines before the first marker are
/// ignored.
pub fn parse_worktree_porcelain(raw: &str) -> WorktreeEntries<'_> {
    WorktreeEntries {
        lines: raw.lines(),
        next_path: None,
    }
}

pub struct WorktreeEntries<'a> {
    lines: std::str::Lines<'a>,
    next_path: Option<PathBuf>,
}

impl Iterator for WorktreeEntries<'_> {
    type Item = WorktreeInfo;

    fn next(&mut self) -> Option<WorktreeInfo> {
        let mut path = self.next_path.take();
        let mut branch = None;
        let mut head = None;

        for line in self.lines.by_ref() {
            if line.is_empty() {
                if let Some(done) = path.take() {
                    return Some(WorktreeInfo { path: done, branch, head });
                }
                continue;
            }

            if let Some(value) = line.strip_prefix("worktree ") {
                if let Some(done) = path.take() {
                    self.next_path = Some(PathBuf::from(value.trim()));
                    return Some(WorktreeInfo { path: done, branch, head });
                }
                path = Some(PathBuf::from(value.trim()));
                continue;
            }

            if path.is_none() {
                continue;
            }

            if let Some(value) = line.strip_prefix("branch ") {
                let value = value.trim();
                branch = Some(
                    value
                        .strip_prefix("refs/heads/")
                        .unwrap_or(value)
                        .to_string(),
                );
            } else if let Some(value) = line.strip_prefix("HEAD ") {
                head = Some(value.trim().to_string());
            }
        }

        path.map(|path| WorktreeInfo { path, branch, head })
    }
}
