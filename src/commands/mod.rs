pub mod amend;
pub mod branch;
pub mod continue_cmd;
pub mod list;
pub mod open;
pub mod push;
pub mod restack;
pub mod status;
pub mod submit;
pub mod sync;

use crate::config::Config;
use crate::engine::{self, finish, rebase_chain, ChainReport, Confirmer, OpJournal, StackGraph};
use crate::error::StackError;
use crate::git::{GitConfigStore, GitRepo, Vcs};
use crate::remote;
use anyhow::Result;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};

/// Asks on the terminal unless `--yes` was given.
pub struct PromptConfirm {
    assume_yes: bool,
}

impl PromptConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirmer for PromptConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(answer)
    }
}

/// Everything a stack command works with, loaded once per invocation.
pub struct Session {
    pub repo: GitRepo,
    pub graph: StackGraph<GitConfigStore>,
    pub config: Config,
    pub assume_yes: bool,
}

impl Session {
    pub fn open(assume_yes: bool) -> Result<Self> {
        let repo = GitRepo::open()?;
        let graph = engine::load_graph(&repo)?;
        let config = Config::load()?;
        Ok(Self {
            repo,
            graph,
            config,
            assume_yes,
        })
    }

    pub fn trunk(&self) -> String {
        self.graph.trunk().to_string()
    }

    pub fn remote_name(&self) -> Result<String> {
        remote::remote_name(&self.repo, &self.config)
    }

    pub fn confirmer(&self) -> PromptConfirm {
        PromptConfirm::new(self.assume_yes)
    }

    pub fn current_branch(&self) -> Result<String> {
        self.repo.current_branch()
    }

    pub fn require_clean(&self) -> Result<()> {
        if !self.repo.working_tree_is_clean()? {
            return Err(StackError::precondition(
                "Working tree has uncommitted changes.",
                "commit or stash them, then run the command again",
            )
            .into());
        }
        Ok(())
    }

    pub fn require_idle(&self) -> Result<()> {
        if let Some(journal) = OpJournal::read(self.graph.store())? {
            return Err(StackError::precondition(
                format!(
                    "A `stk {}` operation started at {} is still in progress.",
                    journal.command, journal.started
                ),
                "resolve any conflicts and run `stk continue`",
            )
            .into());
        }
        if self.repo.rebase_in_progress()? {
            return Err(StackError::precondition(
                "A git rebase is in progress.",
                "finish it with `git rebase --continue` or `git rebase --abort`",
            )
            .into());
        }
        Ok(())
    }

    /// Parent of a branch that must be tracked.
    pub fn require_tracked(&self, branch: &str) -> Result<String> {
        match self.graph.parent(branch) {
            Some(parent) => Ok(parent.to_string()),
            None if branch == self.graph.trunk() => Err(StackError::UserInput(format!(
                "'{}' is the trunk branch",
                branch
            ))
            .into()),
            None => Err(StackError::precondition(
                format!("Branch '{}' is not tracked.", branch),
                "run `stk track` on it first",
            )
            .into()),
        }
    }

    /// Persist `journal`, run its rebases and finish the operation.
    pub fn execute(&mut self, journal: OpJournal) -> Result<ChainReport> {
        journal.write(self.graph.store_mut())?;
        self.resume(journal)
    }

    /// Run the remaining steps of an already persisted journal.
    pub fn resume(&mut self, mut journal: OpJournal) -> Result<ChainReport> {
        let report = rebase_chain(&self.repo, &mut self.graph, &mut journal)?;
        let confirmer = self.confirmer();
        finish(&self.repo, &mut self.graph, &journal, &confirmer)?;
        Ok(report)
    }

    /// Tell the operator which stack branches now differ from the remote.
    pub fn print_push_hint(&self, branches: &[String]) -> Result<()> {
        let Ok(remote) = self.remote_name() else {
            return Ok(());
        };
        let stale = engine::push::needs_push(&self.repo, &remote, branches)?;
        if !stale.is_empty() {
            println!();
            println!(
                "{} {} to update: {}",
                "Run".dimmed(),
                "stk push".cyan(),
                stale.join(", ")
            );
        }
        Ok(())
    }
}
