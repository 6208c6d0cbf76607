use super::graph::StackGraph;
use super::store::ConfigStore;
use crate::git::Vcs;
use crate::review::{RequestStatus, ReviewService};
use anyhow::Result;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reparenting {
    pub branch: String,
    pub old_parent: String,
    pub new_parent: String,
}

/// Outcome of checking one stack against the remote trunk.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Merged branches leaving the stack, bottom to top
    pub merged: Vec<String>,
    /// Surviving branches, bottom to top
    pub unmerged: Vec<String>,
    /// Merged branches sitting above the topmost survivor. They stay where
    /// they are, parent link included.
    pub retained: Vec<String>,
    pub reparentings: Vec<Reparenting>,
}

impl Reconciliation {
    /// Branches still in the stack afterwards, bottom to top.
    pub fn remaining(&self) -> Vec<String> {
        self.unmerged
            .iter()
            .chain(&self.retained)
            .cloned()
            .collect()
    }
}

/// Decides whether a branch has landed.
///
/// A linked pull request is authoritative when the host answers with a real
/// status; only a missing link, a failed query or an unknown request fall back
/// to asking whether the branch tip is already in the remote trunk.
pub struct MergeProbe<'a, V: Vcs> {
    vcs: &'a V,
    review: Option<&'a dyn ReviewService>,
    remote_trunk: String,
}

impl<'a, V: Vcs> MergeProbe<'a, V> {
    pub fn new(vcs: &'a V, review: Option<&'a dyn ReviewService>, remote_trunk: &str) -> Self {
        Self {
            vcs,
            review,
            remote_trunk: remote_trunk.to_string(),
        }
    }

    pub fn is_merged(&self, branch: &str, review_id: Option<u64>) -> Result<bool> {
        if let (Some(id), Some(review)) = (review_id, self.review) {
            match review.request_status(id) {
                Ok(RequestStatus::Merged) => return Ok(true),
                Ok(RequestStatus::Open) | Ok(RequestStatus::Closed) => return Ok(false),
                Ok(RequestStatus::NotFound) => {
                    tracing::warn!(branch, id, "pull request not found; checking ancestry");
                }
                Err(err) => {
                    tracing::warn!(branch, id, error = %err, "status query failed; checking ancestry");
                }
            }
        }
        self.vcs.is_ancestor(branch, &self.remote_trunk)
    }
}

/// Classify every branch of `stack` (bottom to top, trunk excluded) and work
/// out new parents for the survivors.
///
/// Each branch is judged on its own, so merges need not be contiguous. Only
/// merged branches below the topmost survivor leave the stack; merged ones
/// above it are retained untouched. A survivor whose recorded parent left is
/// attached to the nearest surviving branch below it, or trunk when there is
/// none.
pub fn reconcile<S: ConfigStore>(
    graph: &StackGraph<S>,
    stack: &[String],
    mut is_merged: impl FnMut(&str) -> Result<bool>,
) -> Result<Reconciliation> {
    let mut flags = Vec::with_capacity(stack.len());
    for branch in stack {
        flags.push(is_merged(branch)?);
    }
    let top_survivor = flags.iter().rposition(|merged| !merged);

    let mut result = Reconciliation::default();
    for (index, (branch, merged)) in stack.iter().zip(flags).enumerate() {
        match (merged, top_survivor) {
            (false, _) => result.unmerged.push(branch.clone()),
            (true, Some(top)) if index > top => result.retained.push(branch.clone()),
            (true, _) => result.merged.push(branch.clone()),
        }
    }

    let merged: HashSet<&str> = result.merged.iter().map(String::as_str).collect();
    let mut last_unmerged = graph.trunk().to_string();
    for branch in &result.unmerged {
        if let Some(parent) = graph.parent(branch) {
            if merged.contains(parent) {
                result.reparentings.push(Reparenting {
                    branch: branch.clone(),
                    old_parent: parent.to_string(),
                    new_parent: last_unmerged.clone(),
                });
            }
        }
        last_unmerged = branch.clone();
    }

    Ok(result)
}

/// Record the outcome: merged branches leave their stacks and the survivors
/// are re-linked. The survivors keep their parent revisions so the next
/// rebase drops exactly the merged commits.
pub fn apply_reconciliation<S: ConfigStore>(
    graph: &mut StackGraph<S>,
    reconciliation: &Reconciliation,
) -> Result<()> {
    for branch in &reconciliation.merged {
        graph.clear_parent(branch)?;
    }
    for change in &reconciliation.reparentings {
        graph.set_parent(&change.branch, &change.new_parent)?;
        tracing::info!(
            branch = %change.branch,
            from = %change.old_parent,
            to = %change.new_parent,
            "reparented"
        );
    }
    Ok(())
}
