use super::graph::StackGraph;
use super::journal::{OpJournal, RebaseStep};
use super::store::ConfigStore;
use crate::error::StackError;
use crate::git::{RebaseResult, Vcs};
use anyhow::Result;
use colored::Colorize;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChainReport {
    pub rebased: Vec<String>,
    pub skipped: Vec<String>,
    /// Rebased branches left with no commits of their own
    pub empty: Vec<String>,
}

/// Pick the commit after which `step.branch`'s own work starts: the explicit
/// upstream if it is still in the branch's history, then the recorded parent
/// revision, then the parent itself (plain `git rebase <parent>` semantics).
fn choose_upstream<V: Vcs, S: ConfigStore>(
    vcs: &V,
    graph: &StackGraph<S>,
    step: &RebaseStep,
    parent: &str,
) -> String {
    let candidates = [step.upstream.as_deref(), graph.parent_rev(&step.branch)];
    for candidate in candidates.into_iter().flatten() {
        // A SHA that no longer resolves is simply not usable
        if vcs.is_ancestor(candidate, &step.branch).unwrap_or(false) {
            return candidate.to_string();
        }
    }
    parent.to_string()
}

/// Rebase each step's branch onto its recorded parent, in order, starting at
/// `journal.cursor`.
///
/// The cursor is persisted before each step. A step whose branch already sits
/// on its parent with nothing to drop is skipped without touching the branch,
/// so rerunning a step after a resolved conflict is harmless. On conflict the
/// working tree is left mid-rebase, the journal stays in place and
/// [`StackError::ConflictPaused`] is returned.
pub fn rebase_chain<V: Vcs, S: ConfigStore>(
    vcs: &V,
    graph: &mut StackGraph<S>,
    journal: &mut OpJournal,
) -> Result<ChainReport> {
    let mut report = ChainReport::default();

    for index in journal.cursor..journal.steps.len() {
        journal.set_cursor(index, graph.store_mut())?;
        let step = journal.steps[index].clone();
        let branch = step.branch.as_str();

        if !vcs.branch_exists(branch) {
            tracing::warn!(branch, "branch disappeared; skipping");
            continue;
        }
        let Some(parent) = graph.parent(branch).map(str::to_string) else {
            tracing::warn!(branch, "branch is no longer tracked; skipping");
            continue;
        };

        let upstream = choose_upstream(vcs, graph, &step, &parent);
        if vcs.is_ancestor(&parent, branch)? && vcs.is_ancestor(&upstream, &parent)? {
            graph.set_parent_rev(branch, &vcs.branch_commit(&parent)?)?;
            println!("  {} {}", branch.white(), "already up to date".dimmed());
            report.skipped.push(branch.to_string());
            continue;
        }

        println!("  {} onto {}", branch.white(), parent.blue());
        tracing::debug!(branch, parent = %parent, upstream = %upstream, "rebasing");
        vcs.checkout(branch)?;

        match vcs.rebase(&parent, &upstream)? {
            RebaseResult::Success => {
                graph.set_parent_rev(branch, &vcs.branch_commit(&parent)?)?;
                if vcs.commit_count(&parent, branch)? == 0 {
                    println!(
                        "    {} '{}' has no commits left; its pull request may be closed when pushed",
                        "!".yellow(),
                        branch
                    );
                    tracing::warn!(branch, "branch is empty after rebase");
                    report.empty.push(branch.to_string());
                }
                report.rebased.push(branch.to_string());
            }
            RebaseResult::Conflict => {
                println!();
                println!(
                    "{}",
                    format!("Conflict while rebasing '{}' onto '{}'.", branch, parent).red()
                );
                println!("Resolve the conflicts, then:");
                println!("  {}", "git add <files> && git rebase --continue".cyan());
                println!("  {}", "stk continue".cyan());
                return Err(StackError::ConflictPaused {
                    branch: branch.to_string(),
                }
                .into());
            }
        }
    }

    journal.set_cursor(journal.steps.len(), graph.store_mut())?;
    Ok(report)
}
