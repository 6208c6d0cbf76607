//! Durable record of a multi-step operation that may stop on a conflict.
//!
//! The entry lives in the `stk-op` section next to the branch metadata. Its
//! presence means an operation is in flight; `stk continue` picks it up and
//! every successful path ends in [`finish`], which clears it.

use super::graph::StackGraph;
use super::store::ConfigStore;
use crate::git::Vcs;
use anyhow::{Context, Result};
use colored::Colorize;

const SECTION: &str = "stk-op";
const FIELDS: [&str; 7] = [
    "command",
    "origin",
    "pending",
    "confirmed",
    "steps",
    "cursor",
    "started",
];

fn key(field: &str) -> String {
    format!("{}.{}", SECTION, field)
}

/// One branch to move during a chain rebase. The branch is rebased onto
/// its recorded parent; `upstream` is the commit its own work starts after
/// when that is known better than the stored parent revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseStep {
    pub branch: String,
    pub upstream: Option<String>,
}

impl RebaseStep {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            upstream: None,
        }
    }

    pub fn with_upstream(branch: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            upstream: Some(upstream.into()),
        }
    }

    fn encode(&self) -> String {
        match &self.upstream {
            // ':' cannot appear in a branch name
            Some(upstream) => format!("{}:{}", self.branch, upstream),
            None => self.branch.clone(),
        }
    }

    fn decode(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((branch, upstream)) => Self::with_upstream(branch, upstream),
            None => Self::new(raw),
        }
    }
}

/// Steps for every branch in `branches`, in order, without explicit upstreams.
pub fn steps_for(branches: &[String]) -> Vec<RebaseStep> {
    branches.iter().map(RebaseStep::new).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpJournal {
    /// Command that started the operation (`sync`, `restack`, ...)
    pub command: String,
    /// Branch checked out when the operation started
    pub origin: String,
    /// Branches to delete once all rebases are done
    pub pending_deletions: Vec<String>,
    /// Deletions were already approved when the operation started
    pub deletions_confirmed: bool,
    pub steps: Vec<RebaseStep>,
    /// Index of the step being executed
    pub cursor: usize,
    /// RFC 3339 start time
    pub started: String,
}

impl OpJournal {
    pub fn new(command: &str, origin: &str) -> Self {
        Self {
            command: command.to_string(),
            origin: origin.to_string(),
            pending_deletions: Vec::new(),
            deletions_confirmed: false,
            steps: Vec::new(),
            cursor: 0,
            started: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_steps(mut self, steps: Vec<RebaseStep>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_deletions(mut self, branches: Vec<String>, confirmed: bool) -> Self {
        self.pending_deletions = branches;
        self.deletions_confirmed = confirmed;
        self
    }

    /// Whether an operation is in flight
    pub fn exists(store: &impl ConfigStore) -> Result<bool> {
        Ok(store.get(&key("command"))?.is_some())
    }

    pub fn read(store: &impl ConfigStore) -> Result<Option<Self>> {
        let Some(command) = store.get(&key("command"))? else {
            return Ok(None);
        };
        let field = |name: &str| -> Result<String> {
            Ok(store.get(&key(name))?.unwrap_or_default())
        };

        let cursor = field("cursor")?;
        Ok(Some(Self {
            command,
            origin: field("origin")?,
            pending_deletions: field("pending")?
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            deletions_confirmed: field("confirmed")? == "true",
            steps: field("steps")?
                .split_whitespace()
                .map(RebaseStep::decode)
                .collect(),
            cursor: if cursor.is_empty() {
                0
            } else {
                cursor
                    .parse()
                    .with_context(|| format!("Invalid {} value '{}'", key("cursor"), cursor))?
            },
            started: field("started")?,
        }))
    }

    /// Persist the whole entry. `command` goes last so a torn write never
    /// looks like a complete journal.
    pub fn write(&self, store: &mut impl ConfigStore) -> Result<()> {
        let steps: Vec<String> = self.steps.iter().map(RebaseStep::encode).collect();
        store.set(&key("origin"), &self.origin)?;
        store.set(&key("pending"), &self.pending_deletions.join(" "))?;
        store.set(&key("confirmed"), if self.deletions_confirmed { "true" } else { "false" })?;
        store.set(&key("steps"), &steps.join(" "))?;
        store.set(&key("cursor"), &self.cursor.to_string())?;
        store.set(&key("started"), &self.started)?;
        store.set(&key("command"), &self.command)?;
        Ok(())
    }

    /// Record the step about to run.
    pub fn set_cursor(&mut self, cursor: usize, store: &mut impl ConfigStore) -> Result<()> {
        self.cursor = cursor;
        store.set(&key("cursor"), &cursor.to_string())
    }

    /// Remove the entry. `command` goes first so a torn delete reads as "none".
    pub fn delete(store: &mut impl ConfigStore) -> Result<()> {
        for field in FIELDS {
            store.unset(&key(field))?;
        }
        Ok(())
    }
}

/// Asks the operator to approve a destructive step.
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Fixed answer, for `--yes` and tests.
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(self.0)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FinishReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
    pub checked_out: String,
}

/// Complete an operation: delete the pending branches the operator approves,
/// return to the starting branch (or trunk if it is gone) and clear the
/// journal. Shared by every command and by `stk continue`.
pub fn finish<V: Vcs, S: ConfigStore>(
    vcs: &V,
    graph: &mut StackGraph<S>,
    journal: &OpJournal,
    confirmer: &dyn Confirmer,
) -> Result<FinishReport> {
    let trunk = graph.trunk().to_string();
    let mut report = FinishReport::default();

    for branch in &journal.pending_deletions {
        if !vcs.branch_exists(branch) {
            graph.untrack(branch)?;
            continue;
        }

        let approved = journal.deletions_confirmed
            || confirmer.confirm(&format!("Delete branch '{}'?", branch))?;
        if !approved {
            println!("  {} {}", "kept".yellow(), branch);
            report.kept.push(branch.clone());
            continue;
        }

        if vcs.current_branch()? == *branch {
            vcs.checkout(&trunk)?;
        }
        vcs.delete_branch(branch)?;
        graph.untrack(branch)?;
        println!("  {} {}", "deleted".green(), branch.bright_black());
        report.deleted.push(branch.clone());
    }

    let target = if vcs.branch_exists(&journal.origin) {
        journal.origin.clone()
    } else {
        trunk
    };
    if vcs.current_branch()? != target {
        vcs.checkout(&target)?;
    }
    report.checked_out = target;

    OpJournal::delete(graph.store_mut())?;
    tracing::debug!(command = %journal.command, "operation finished");
    Ok(report)
}
