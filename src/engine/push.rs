use crate::git::Vcs;
use anyhow::Result;

/// Branches whose local tip differs from `<remote>/<branch>`. A branch the
/// remote has never seen counts as differing.
pub fn needs_push<V: Vcs>(vcs: &V, remote: &str, branches: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for branch in branches {
        if !vcs.branch_exists(branch) {
            continue;
        }
        let local = vcs.branch_commit(branch)?;
        if vcs.remote_commit(remote, branch)?.as_deref() != Some(local.as_str()) {
            out.push(branch.clone());
        }
    }
    Ok(out)
}
