pub(crate) const DEFAULT_BASE_BRANCH: &str = "main";
pub(crate) const TASK_BRANCH_PREFIX: &str = "task/";
pub(crate) const DEFAULT_BASE_DIR_NAME: &str = "worktrees";
