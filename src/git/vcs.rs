use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseResult {
    Success,
    Conflict,
}

/// The version-control primitives the stack engine drives.
///
/// Refs passed in may be branch names, remote-tracking names
/// (`origin/main`) or commit SHAs.
pub trait Vcs {
    fn current_branch(&self) -> Result<String>;

    fn checkout(&self, branch: &str) -> Result<()>;

    /// Create `name` pointing at the tip of `from`. Does not check it out.
    fn create_branch(&self, name: &str, from: &str) -> Result<()>;

    /// Delete a local branch regardless of merge state.
    fn delete_branch(&self, name: &str) -> Result<()>;

    fn branch_exists(&self, name: &str) -> bool;

    fn list_branches(&self) -> Result<Vec<String>>;

    /// Full SHA of a ref.
    fn branch_commit(&self, branch: &str) -> Result<String>;

    /// SHA of `<remote>/<branch>`, or `None` when the remote has no such branch.
    fn remote_commit(&self, remote: &str, branch: &str) -> Result<Option<String>>;

    /// Rebase the checked-out branch: replay the commits after `upstream`
    /// onto `onto`.
    fn rebase(&self, onto: &str, upstream: &str) -> Result<RebaseResult>;

    /// Number of commits reachable from `head` but not from `base`.
    fn commit_count(&self, base: &str, head: &str) -> Result<usize>;

    /// True when `ancestor` is reachable from `descendant` (or is the same commit).
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    fn merge_base(&self, left: &str, right: &str) -> Result<Option<String>>;

    fn fetch(&self, remote: &str) -> Result<()>;

    /// Move `branch` forward to `target` if that is a fast-forward.
    /// Returns false when the histories have diverged.
    fn fast_forward(&self, branch: &str, target: &str) -> Result<bool>;

    fn push_force_with_lease(&self, remote: &str, branches: &[String]) -> Result<()>;

    fn working_tree_is_clean(&self) -> Result<bool>;

    fn rebase_in_progress(&self) -> Result<bool>;
}
