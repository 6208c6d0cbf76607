pub mod divergence;
pub mod graph;
pub mod journal;
pub mod push;
pub mod rebase;
pub mod reconcile;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use divergence::find_divergence;
pub use graph::StackGraph;
pub use journal::{finish, AutoConfirm, Confirmer, OpJournal, RebaseStep};
pub use rebase::{rebase_chain, ChainReport};
pub use reconcile::{apply_reconciliation, reconcile, MergeProbe, Reconciliation};
pub use store::{ConfigStore, MemoryStore};
pub use sync::{sync_stacks, SyncReport};

use crate::git::{GitConfigStore, GitRepo, Vcs};
use anyhow::Result;

/// Load the stack graph for an on-disk repository.
pub fn load_graph(repo: &GitRepo) -> Result<StackGraph<GitConfigStore>> {
    let trunk = repo.trunk_branch()?;
    let store = GitConfigStore::open(repo)?;
    StackGraph::load(store, &trunk, repo.list_branches()?)
}
