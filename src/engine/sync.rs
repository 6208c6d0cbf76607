//! One reconciliation pass over every stack rooted on trunk.

use super::graph::StackGraph;
use super::journal::{finish, steps_for, Confirmer, FinishReport, OpJournal};
use super::rebase::{rebase_chain, ChainReport};
use super::reconcile::{apply_reconciliation, reconcile, MergeProbe, Reconciliation};
use super::store::ConfigStore;
use crate::git::Vcs;
use crate::review::ReviewService;
use anyhow::Result;
use colored::Colorize;

#[derive(Debug, Default)]
pub struct SyncReport {
    /// Local trunk now matches the remote
    pub trunk_updated: bool,
    /// Tracked branches moved onto trunk because their parent was gone
    pub reattached: Vec<String>,
    pub reconciliations: Vec<Reconciliation>,
    pub chain: ChainReport,
    pub finish: FinishReport,
}

impl SyncReport {
    /// Branches left in stacks after the pass, bottom to top per stack.
    pub fn remaining(&self) -> Vec<String> {
        self.reconciliations
            .iter()
            .flat_map(Reconciliation::remaining)
            .collect()
    }

    pub fn merged(&self) -> Vec<String> {
        self.reconciliations
            .iter()
            .flat_map(|r| r.merged.iter().cloned())
            .collect()
    }
}

/// Fetch, fast-forward trunk, reconcile every stack and rebase what is left.
///
/// Reconciliation only reads. The journal, with every merged branch queued
/// for deletion, is written before the first relationship changes, so a
/// failure anywhere after that point is picked up by `stk continue`.
pub fn sync_stacks<V: Vcs, S: ConfigStore>(
    vcs: &V,
    graph: &mut StackGraph<S>,
    review: Option<&dyn ReviewService>,
    remote: &str,
    confirmer: &dyn Confirmer,
    assume_yes: bool,
) -> Result<SyncReport> {
    let trunk = graph.trunk().to_string();
    let remote_trunk = format!("{}/{}", remote, trunk);
    let origin = vcs.current_branch()?;
    let mut report = SyncReport::default();

    print!("  Fetching from {}... ", remote);
    vcs.fetch(remote)?;
    println!("{}", "done".green());

    print!("  Updating {}... ", trunk.cyan());
    if vcs.remote_commit(remote, &trunk)?.is_none() {
        println!("{}", format!("'{}' not found on remote", trunk).yellow());
        anyhow::bail!("Remote branch '{}' does not exist", remote_trunk);
    }
    report.trunk_updated = vcs.fast_forward(&trunk, &remote_trunk)?;
    if report.trunk_updated {
        println!("{}", "done".green());
    } else {
        println!("{}", "diverged from remote, left as is".yellow());
        tracing::warn!(trunk = %trunk, "local trunk has commits the remote does not");
    }

    report.reattached = reattach_orphans(graph)?;

    let probe = MergeProbe::new(vcs, review, &remote_trunk);
    for root in graph.children(&trunk) {
        let view: &StackGraph<S> = graph;
        let stack = view.full_stack(&root)?;
        let reconciliation = reconcile(view, &stack, |branch| {
            probe.is_merged(branch, view.review_id(branch))
        })?;
        print_reconciliation(&reconciliation);
        report.reconciliations.push(reconciliation);
    }

    let merged = report.merged();
    if merged.is_empty() {
        println!("  {}", "No merged branches.".dimmed());
    }
    let remaining = report.remaining();

    let mut journal = OpJournal::new("sync", &origin)
        .with_deletions(merged, assume_yes)
        .with_steps(steps_for(&remaining));
    journal.write(graph.store_mut())?;

    for reconciliation in &report.reconciliations {
        apply_reconciliation(graph, reconciliation)?;
    }
    if let Some(review) = review {
        for change in report.reconciliations.iter().flat_map(|r| &r.reparentings) {
            if let Some(id) = graph.review_id(&change.branch) {
                review.update_request_base(id, &change.new_parent)?;
                println!("    Retargeted PR #{} to '{}'", id, change.new_parent);
            }
        }
    }

    if !remaining.is_empty() {
        println!();
        println!("{}", "Restacking...".bold());
    }
    report.chain = rebase_chain(vcs, graph, &mut journal)?;
    report.finish = finish(vcs, graph, &journal, confirmer)?;
    Ok(report)
}

/// Tracked branches whose parent was deleted outside stk are moved onto
/// trunk so they are reconciled with everything else.
fn reattach_orphans<S: ConfigStore>(graph: &mut StackGraph<S>) -> Result<Vec<String>> {
    let trunk = graph.trunk().to_string();
    let mut moved = Vec::new();
    for branch in graph.tracked_branches() {
        let Some(parent) = graph.parent(&branch).map(str::to_string) else {
            continue;
        };
        if parent != trunk && !graph.is_live(&parent) {
            println!(
                "  {} parent '{}' of '{}' is gone; moving it onto {}",
                "!".yellow(),
                parent,
                branch,
                trunk
            );
            graph.set_parent(&branch, &trunk)?;
            moved.push(branch);
        }
    }
    Ok(moved)
}

fn print_reconciliation(reconciliation: &Reconciliation) {
    for branch in &reconciliation.merged {
        println!("  {} {}", "merged".green(), branch.bright_black());
    }
    for branch in &reconciliation.retained {
        println!(
            "  {} {} (merged, but stacked above unmerged work)",
            "kept".yellow(),
            branch
        );
    }
    for change in &reconciliation.reparentings {
        println!(
            "  {} {} ({} -> {})",
            "moved".cyan(),
            change.branch,
            change.old_parent.dimmed(),
            change.new_parent.blue()
        );
    }
}
