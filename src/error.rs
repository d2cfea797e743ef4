use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GroveError>;

/// Failures surfaced by the worktree manager. Variants that wrap a git
/// failure carry the tool's diagnostic text verbatim so callers can debug
/// the underlying repository state.
#[derive(Debug, Error)]
pub enum GroveError {
    #[error("{} is not a git repository: {details}", .path.display())]
    NotARepository { path: PathBuf, details: String },

    #[error("invalid worktree name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("failed to create worktree `{name}`: {details}")]
    WorktreeCreation { name: String, details: String },

    #[error("failed to list git worktrees: {details}")]
    VcsQuery { details: String },

    #[error("failed to remove worktree at {}: {source}", .path.display())]
    Removal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run git: {0}")]
    GitSpawn(#[source] std::io::Error),
}
