use crate::git::Vcs;
use anyhow::Result;

/// Walk `stack` (bottom to top, trunk excluded) and return the lower branch of
/// the first adjacent pair whose parent tip is not an ancestor of the child
/// tip. Everything above the returned branch needs to be rebased.
pub fn find_divergence<V: Vcs>(vcs: &V, stack: &[String]) -> Result<Option<String>> {
    for pair in stack.windows(2) {
        let (parent, child) = (&pair[0], &pair[1]);
        if !vcs.is_ancestor(parent, child)? {
            tracing::debug!(parent = %parent, child = %child, "stack diverges");
            return Ok(Some(parent.clone()));
        }
    }
    Ok(None)
}
