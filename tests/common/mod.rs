//! Common test utilities for stk integration tests
//!
//! This module provides reusable test infrastructure including:
//! - `TestRepo` - Creates real temporary git repositories for testing
//! - Helper methods for common test scenarios
//! - Assertion utilities for test output

use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Get path to compiled binary (built by cargo test)
pub fn stk_bin() -> &'static str {
    env!("CARGO_BIN_EXE_stk")
}

fn git_in(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git command")
}

/// A test repository that creates a temporary git repo with proper initialization
pub struct TestRepo {
    dir: TempDir,
    /// Holds the stk config file so the user's real config is never read
    config_dir: TempDir,
    /// Optional bare repository acting as "origin" remote
    #[allow(dead_code)]
    remote_dir: Option<TempDir>,
}

#[allow(dead_code)]
impl TestRepo {
    /// Create a new test repository with git init and an initial commit on main
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = TempDir::new().expect("Failed to create config dir");
        let path = dir.path();

        git_in(path, &["init", "-b", "main"]);
        git_in(path, &["config", "user.email", "test@test.com"]);
        git_in(path, &["config", "user.name", "Test User"]);

        fs::write(path.join("README.md"), "# Test Repo\n").expect("Failed to write README");
        git_in(path, &["add", "-A"]);
        git_in(path, &["commit", "-m", "Initial commit"]);

        Self {
            dir,
            config_dir,
            remote_dir: None,
        }
    }

    /// Create a new test repository with a local bare repo as "origin" remote
    pub fn new_with_remote() -> Self {
        let mut repo = Self::new();

        let remote_dir = TempDir::new().expect("Failed to create remote dir");
        git_in(remote_dir.path(), &["init", "--bare", "-b", "main"]);

        repo.git(&[
            "remote",
            "add",
            "origin",
            remote_dir.path().to_str().unwrap(),
        ]);
        repo.git(&["push", "-u", "origin", "main"]);

        repo.remote_dir = Some(remote_dir);
        repo
    }

    /// Get the path to the remote bare repository (if exists)
    pub fn remote_path(&self) -> Option<PathBuf> {
        self.remote_dir.as_ref().map(|d| d.path().to_path_buf())
    }

    /// Clone the remote into a scratch directory checked out on main
    fn scratch_clone(&self, email: &str) -> TempDir {
        let remote_path = self.remote_path().expect("No remote configured");
        let clone_dir = TempDir::new().expect("Failed to create clone dir");
        let path = clone_dir.path();

        git_in(path, &["clone", remote_path.to_str().unwrap(), "."]);
        git_in(path, &["checkout", "-B", "main", "origin/main"]);
        git_in(path, &["config", "user.email", email]);
        git_in(path, &["config", "user.name", "Other User"]);
        clone_dir
    }

    /// Simulate pushing a commit to the remote main branch (as if another user did it)
    pub fn simulate_remote_commit(&self, filename: &str, content: &str, message: &str) {
        let clone_dir = self.scratch_clone("other@test.com");
        let path = clone_dir.path();

        fs::write(path.join(filename), content).expect("Failed to write file");
        git_in(path, &["add", "-A"]);
        git_in(path, &["commit", "-m", message]);
        git_in(path, &["push", "origin", "main"]);
    }

    /// Merge a branch into main on the remote (simulating PR merge)
    pub fn merge_branch_on_remote(&self, branch: &str) {
        let clone_dir = self.scratch_clone("merger@test.com");
        let path = clone_dir.path();

        git_in(path, &["fetch", "origin", branch]);
        git_in(
            path,
            &[
                "merge",
                &format!("origin/{}", branch),
                "--no-ff",
                "-m",
                &format!("Merge {}", branch),
            ],
        );
        git_in(path, &["push", "origin", "main"]);
    }

    /// Squash-merge a branch into main on the remote. The branch tip does not
    /// end up in main's history.
    pub fn squash_merge_branch_on_remote(&self, branch: &str) {
        let clone_dir = self.scratch_clone("merger@test.com");
        let path = clone_dir.path();

        git_in(path, &["fetch", "origin", branch]);
        git_in(path, &["merge", "--squash", &format!("origin/{}", branch)]);
        git_in(path, &["commit", "-m", &format!("Squashed {}", branch)]);
        git_in(path, &["push", "origin", "main"]);
    }

    /// List remote branches
    pub fn list_remote_branches(&self) -> Vec<String> {
        let output = self.git(&["ls-remote", "--heads", "origin"]);

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.split("refs/heads/").nth(1).map(|s| s.to_string()))
            .collect()
    }

    /// Get the path to the test repository
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Run an stk command in this repository with an isolated config and no
    /// GitHub token
    pub fn run_stk(&self, args: &[&str]) -> Output {
        Command::new(stk_bin())
            .args(args)
            .current_dir(self.path())
            .env("STK_CONFIG", self.config_dir.path().join("config.toml"))
            .env_remove("GITHUB_TOKEN")
            .env_remove("STK_GITHUB_TOKEN")
            .env("GIT_EDITOR", "true")
            .output()
            .expect("Failed to execute stk")
    }

    /// Get stdout as string from output
    pub fn stdout(output: &Output) -> String {
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Get stderr as string from output
    pub fn stderr(output: &Output) -> String {
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    /// Create a file in the repository
    pub fn create_file(&self, name: &str, content: &str) {
        let file_path = self.path().join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(file_path, content).expect("Failed to write file");
    }

    /// Read a file from the working tree
    pub fn read_file(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).expect("Failed to read file")
    }

    /// Stage everything and commit
    pub fn commit(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-m", message]);
    }

    /// Get the current branch name
    pub fn current_branch(&self) -> String {
        let output = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Get list of all branches
    pub fn list_branches(&self) -> Vec<String> {
        let output = self.git(&["branch", "--format=%(refname:short)"]);
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn branch_exists(&self, branch: &str) -> bool {
        self.list_branches().iter().any(|b| b == branch)
    }

    /// Get the commit SHA for a ref
    pub fn get_commit_sha(&self, reference: &str) -> String {
        let output = self.git(&["rev-parse", reference]);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Whether `ancestor` is in the history of `descendant`
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        self.git(&["merge-base", "--is-ancestor", ancestor, descendant])
            .status
            .success()
    }

    /// Number of commits on `head` that are not on `base`
    pub fn commit_count(&self, base: &str, head: &str) -> usize {
        let output = self.git(&["rev-list", "--count", &format!("{}..{}", base, head)]);
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .expect("Invalid rev-list output")
    }

    /// Read a value from the repository's local git config
    pub fn config_value(&self, key: &str) -> Option<String> {
        let output = self.git(&["config", "--local", "--get", key]);
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Recorded parent of a branch
    pub fn parent_of(&self, branch: &str) -> Option<String> {
        self.config_value(&format!("stk-branch.{}.parent", branch))
    }

    /// Whether an stk operation journal is on disk
    pub fn has_pending_operation(&self) -> bool {
        self.config_value("stk-op.command").is_some()
    }

    /// Run a raw git command
    pub fn git(&self, args: &[&str]) -> Output {
        git_in(self.dir.path(), args)
    }

    /// Create a stack of branches, each with one commit adding `<name>.txt`
    pub fn create_stack(&self, names: &[&str]) -> Vec<String> {
        let mut created_branches = Vec::new();

        for name in names.iter() {
            let output = self.run_stk(&["create", name]);
            assert!(
                output.status.success(),
                "Failed to create branch {}: {}",
                name,
                Self::stderr(&output)
            );

            self.create_file(&format!("{}.txt", name), &format!("content for {}", name));
            self.commit(&format!("Commit for {}", name));

            assert_eq!(self.current_branch(), *name);
            created_branches.push(name.to_string());
        }

        created_branches
    }

    /// Push branches to origin
    pub fn push(&self, branches: &[&str]) {
        let mut args = vec!["push", "origin"];
        args.extend_from_slice(branches);
        let output = self.git(&args);
        assert!(output.status.success(), "push failed: {}", Self::stderr(&output));
    }

    /// Check if there's an active rebase in progress
    pub fn has_rebase_in_progress(&self) -> bool {
        let git_dir = self.path().join(".git");
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }

    /// Get status JSON output parsed
    pub fn get_status_json(&self) -> Value {
        let output = self.run_stk(&["status", "--json"]);
        assert!(
            output.status.success(),
            "Status failed: {}",
            Self::stderr(&output)
        );
        serde_json::from_str(&Self::stdout(&output)).expect("Invalid JSON from status")
    }
}

// =============================================================================
// Output Assertion Helpers
// =============================================================================

/// Extension trait for fluent assertions on command Output
#[allow(dead_code)]
pub trait OutputAssertions {
    fn assert_success(&self) -> &Self;
    fn assert_failure(&self) -> &Self;
    fn assert_exit_code(&self, code: i32) -> &Self;
    fn assert_stdout_contains(&self, s: &str) -> &Self;
    fn assert_stderr_contains(&self, s: &str) -> &Self;
    fn assert_stdout_not_contains(&self, s: &str) -> &Self;
}

#[allow(dead_code)]
impl OutputAssertions for Output {
    fn assert_success(&self) -> &Self {
        assert!(
            self.status.success(),
            "Expected success but got failure.\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        );
        self
    }

    fn assert_failure(&self) -> &Self {
        assert!(
            !self.status.success(),
            "Expected failure but got success.\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        );
        self
    }

    fn assert_exit_code(&self, code: i32) -> &Self {
        assert_eq!(
            self.status.code(),
            Some(code),
            "Unexpected exit code.\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        );
        self
    }

    fn assert_stdout_contains(&self, s: &str) -> &Self {
        let stdout = String::from_utf8_lossy(&self.stdout);
        assert!(
            stdout.contains(s),
            "Expected stdout to contain '{}', got:\n{}",
            s,
            stdout
        );
        self
    }

    fn assert_stderr_contains(&self, s: &str) -> &Self {
        let stderr = String::from_utf8_lossy(&self.stderr);
        assert!(
            stderr.contains(s),
            "Expected stderr to contain '{}', got:\n{}",
            s,
            stderr
        );
        self
    }

    fn assert_stdout_not_contains(&self, s: &str) -> &Self {
        let stdout = String::from_utf8_lossy(&self.stdout);
        assert!(
            !stdout.contains(s),
            "Expected stdout NOT to contain '{}', but it did:\n{}",
            s,
            stdout
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_repo_setup() {
        let repo = TestRepo::new();
        assert!(repo.path().exists());
        assert_eq!(repo.current_branch(), "main");
        assert!(repo.branch_exists("main"));
    }

    #[test]
    fn test_common_create_stack() {
        let repo = TestRepo::new();
        let branches = repo.create_stack(&["feature-a", "feature-b"]);

        assert_eq!(branches, vec!["feature-a", "feature-b"]);
        assert_eq!(repo.current_branch(), "feature-b");
        assert_eq!(repo.parent_of("feature-b").as_deref(), Some("feature-a"));
    }
}
