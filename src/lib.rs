//! Isolated git worktrees for parallel agent tasks.
//!
//! A [`WorktreeManager`] hands each concurrent task its own working
//! directory, checked out on a dedicated branch of one shared repository,
//! and tears the directory down again when the task is done. It is a thin
//! stateful wrapper around `git worktree`: git's porcelain output is the
//! ground truth, the manager's registry is a cache of it.
//!
//! ```no_run
//! use grove::WorktreeManager;
//!
//! # fn main() -> grove::Result<()> {
//! let manager = WorktreeManager::new("/path/to/repo")?;
//! let checkout = manager.create_worktree("feat-x")?;
//! // ... run a task inside `checkout` ...
//! manager.remove_worktree("feat-x", true)?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod error;
mod git;
mod manager;
mod process;

pub use error::{GroveError, Result};
pub use git::{WorktreeEntries, WorktreeInfo, WorktreeList, parse_worktree_porcelain};
pub use manager::WorktreeManager;
