use super::config::GitConfigStore;
use super::vcs::{RebaseResult, Vcs};
use anyhow::{Context, Result};
use git2::{BranchType, ErrorCode, Oid, Repository};
use std::path::Path;
use std::process::{Command, Output, Stdio};

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open the repository at the current directory or any parent
    pub fn open() -> Result<Self> {
        Self::open_at(Path::new("."))
    }

    /// Open the repository containing `path`
    pub fn open_at(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).context("Not in a git repository")?;
        Ok(Self { repo })
    }

    /// Get the repository root path
    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .context("Repository has no working directory")
    }

    /// Get underlying repository (for advanced operations)
    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// Get the trunk branch name (from `stk.trunk` or auto-detect main/master)
    pub fn trunk_branch(&self) -> Result<String> {
        let configured = GitConfigStore::open(self)?.trunk()?;
        match configured {
            Some(trunk) if !trunk.is_empty() => Ok(trunk),
            _ => self.detect_trunk(),
        }
    }

    /// Auto-detect trunk branch (main or master)
    pub fn detect_trunk(&self) -> Result<String> {
        for name in ["main", "master"] {
            if self.repo.find_branch(name, BranchType::Local).is_ok() {
                return Ok(name.to_string());
            }
        }
        anyhow::bail!("No trunk branch (main/master) found. Set one with `git config stk.trunk <branch>`.")
    }

    /// Resolve a branch name or ref to an OID
    fn resolve_to_oid(&self, refspec: &str) -> Result<Oid> {
        // Try as local branch first
        if let Ok(branch) = self.repo.find_branch(refspec, BranchType::Local) {
            if let Some(oid) = branch.get().target() {
                return Ok(oid);
            }
        }
        // Try as remote branch (e.g., "origin/main")
        if let Ok(branch) = self.repo.find_branch(refspec, BranchType::Remote) {
            if let Some(oid) = branch.get().target() {
                return Ok(oid);
            }
        }
        // Try revparse (SHAs, HEAD, ...)
        let obj = self
            .repo
            .revparse_single(refspec)
            .with_context(|| format!("Unknown revision '{}'", refspec))?;
        Ok(obj.peel_to_commit()?.id())
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(?args, "git");
        Command::new("git")
            .args(args)
            .current_dir(self.workdir()?)
            .output()
            .with_context(|| format!("Failed to run git {}", args.join(" ")))
    }

    fn git_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.git(args)?;
        if !output.status.success() {
            anyhow::bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }

    /// Stage everything, including untracked files
    pub fn stage_all(&self) -> Result<()> {
        self.git_checked(&["add", "-A"])?;
        Ok(())
    }

    /// Check if anything is staged for commit
    pub fn has_staged_changes(&self) -> Result<bool> {
        let output = self.git(&["diff", "--cached", "--quiet"])?;
        Ok(!output.status.success())
    }

    /// Commit staged changes
    pub fn commit(&self, message: &str) -> Result<()> {
        self.git_checked(&["commit", "-m", message])?;
        Ok(())
    }

    /// Amend HEAD with staged changes, optionally replacing the message
    pub fn amend(&self, message: Option<&str>) -> Result<()> {
        match message {
            Some(msg) => self.git_checked(&["commit", "--amend", "-m", msg])?,
            None => self.git_checked(&["commit", "--amend", "--no-edit"])?,
        };
        Ok(())
    }

    /// Move HEAD to `target`, keeping the index and working tree
    pub fn reset_soft(&self, target: &str) -> Result<()> {
        self.git_checked(&["reset", "--soft", target])?;
        Ok(())
    }

    /// Summary line of the tip commit of a branch
    pub fn commit_subject(&self, branch: &str) -> Result<String> {
        let oid = self.resolve_to_oid(branch)?;
        let commit = self.repo.find_commit(oid)?;
        Ok(commit.summary().unwrap_or_default().to_string())
    }

    /// Get commit messages between base and head (commits on head not in base),
    /// oldest first
    pub fn commits_between(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let base_oid = self.resolve_to_oid(base)?;
        let head_oid = self.resolve_to_oid(head)?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)?;
        revwalk.push(head_oid)?;
        revwalk.hide(base_oid)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(commit.message().unwrap_or_default().trim_end().to_string());
        }
        Ok(commits)
    }
}

impl Vcs for GitRepo {
    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to get HEAD")?;
        if !head.is_branch() {
            anyhow::bail!("HEAD is detached; check out a branch first");
        }
        let name = head
            .shorthand()
            .context("HEAD is not a branch")?
            .to_string();
        Ok(name)
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        let status = Command::new("git")
            .args(["checkout", branch])
            .current_dir(self.workdir()?)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .context("Failed to run git checkout")?;

        if !status.success() {
            anyhow::bail!("git checkout {} failed", branch);
        }
        Ok(())
    }

    fn create_branch(&self, name: &str, from: &str) -> Result<()> {
        let oid = self.resolve_to_oid(from)?;
        let commit = self.repo.find_commit(oid)?;
        self.repo
            .branch(name, &commit, false)
            .with_context(|| format!("Failed to create branch '{}'", name))?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .with_context(|| format!("Branch '{}' not found", name))?;
        branch
            .delete()
            .with_context(|| format!("Failed to delete branch '{}'", name))?;
        Ok(())
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, BranchType::Local).is_ok()
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let branches = self.repo.branches(Some(BranchType::Local))?;
        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn branch_commit(&self, branch: &str) -> Result<String> {
        Ok(self.resolve_to_oid(branch)?.to_string())
    }

    fn remote_commit(&self, remote: &str, branch: &str) -> Result<Option<String>> {
        let name = format!("{}/{}", remote, branch);
        match self.repo.find_branch(&name, BranchType::Remote) {
            Ok(reference) => Ok(reference.get().target().map(|oid| oid.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn rebase(&self, onto: &str, upstream: &str) -> Result<RebaseResult> {
        let status = Command::new("git")
            .args(["rebase", "--onto", onto, upstream])
            .current_dir(self.workdir()?)
            .stdout(Stdio::null())
            .status()
            .context("Failed to run git rebase")?;

        if status.success() {
            Ok(RebaseResult::Success)
        } else if self.rebase_in_progress()? {
            Ok(RebaseResult::Conflict)
        } else {
            anyhow::bail!("git rebase --onto {} {} failed unexpectedly", onto, upstream)
        }
    }

    fn commit_count(&self, base: &str, head: &str) -> Result<usize> {
        let base_oid = self.resolve_to_oid(base)?;
        let head_oid = self.resolve_to_oid(head)?;
        let (ahead, _behind) = self.repo.graph_ahead_behind(head_oid, base_oid)?;
        Ok(ahead)
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let ancestor_oid = self.resolve_to_oid(ancestor)?;
        let descendant_oid = self.resolve_to_oid(descendant)?;
        if ancestor_oid == descendant_oid {
            return Ok(true);
        }
        Ok(self.repo.graph_descendant_of(descendant_oid, ancestor_oid)?)
    }

    fn merge_base(&self, left: &str, right: &str) -> Result<Option<String>> {
        let left_oid = self.resolve_to_oid(left)?;
        let right_oid = self.resolve_to_oid(right)?;
        match self.repo.merge_base(left_oid, right_oid) {
            Ok(base) => Ok(Some(base.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        crate::remote::fetch_remote(self.workdir()?, remote)
    }

    fn fast_forward(&self, branch: &str, target: &str) -> Result<bool> {
        let branch_oid = self.resolve_to_oid(branch)?;
        let target_oid = self.resolve_to_oid(target)?;
        if branch_oid == target_oid {
            return Ok(true);
        }
        if !self.repo.graph_descendant_of(target_oid, branch_oid)? {
            return Ok(false);
        }

        if self.current_branch().ok().as_deref() == Some(branch) {
            // Checked out: let git move the working tree too
            self.git_checked(&["merge", "--ff-only", target])?;
        } else {
            self.repo.reference(
                &format!("refs/heads/{}", branch),
                target_oid,
                true,
                &format!("stk: fast-forward {} to {}", branch, target),
            )?;
        }
        Ok(true)
    }

    fn push_force_with_lease(&self, remote: &str, branches: &[String]) -> Result<()> {
        if branches.is_empty() {
            return Ok(());
        }
        let mut args = vec!["push", "--force-with-lease", remote];
        args.extend(branches.iter().map(String::as_str));
        self.git_checked(&args)?;
        Ok(())
    }

    fn working_tree_is_clean(&self) -> Result<bool> {
        let output = self.git_checked(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    fn rebase_in_progress(&self) -> Result<bool> {
        let git_dir = self.repo.path();
        Ok(git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists())
    }
}
