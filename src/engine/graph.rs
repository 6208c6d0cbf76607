use super::store::ConfigStore;
use crate::error::StackError;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

const BRANCH_SECTION: &str = "stk-branch";

/// What is recorded for one tracked branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchNode {
    /// Branch this one is stacked on
    pub parent: Option<String>,
    /// Commit of the parent this branch was last based on
    pub parent_rev: Option<String>,
    /// Pull request number
    pub review: Option<u64>,
}

/// Parent/child relationships between branches, backed by a [`ConfigStore`].
///
/// Everything is read once at load time. Each mutation is written through
/// to the store before the in-memory map changes, so a crash never leaves
/// the map ahead of what is persisted.
pub struct StackGraph<S: ConfigStore> {
    store: S,
    trunk: String,
    nodes: BTreeMap<String, BranchNode>,
    /// Recorded parent -> branches naming it, kept in step with `nodes`
    child_index: BTreeMap<String, BTreeSet<String>>,
    live: BTreeSet<String>,
}

fn key(branch: &str, attr: &str) -> String {
    format!("{}.{}.{}", BRANCH_SECTION, branch, attr)
}

impl<S: ConfigStore> StackGraph<S> {
    /// Load every recorded relationship. `live_branches` is the set of local
    /// branches; nodes for branches missing from it are kept on disk but
    /// never returned as children.
    pub fn load(store: S, trunk: &str, live_branches: Vec<String>) -> Result<Self> {
        let mut nodes: BTreeMap<String, BranchNode> = BTreeMap::new();
        let prefix = format!("{}.", BRANCH_SECTION);

        for (full_key, value) in store.entries(&prefix)? {
            let Some((branch, attr)) = full_key[prefix.len()..].rsplit_once('.') else {
                continue;
            };
            let node = nodes.entry(branch.to_string()).or_default();
            match attr {
                "parent" => node.parent = Some(value),
                "parentrev" => node.parent_rev = Some(value),
                "review" => match value.parse() {
                    Ok(id) => node.review = Some(id),
                    Err(_) => tracing::warn!(branch, value = %value, "ignoring unparsable review id"),
                },
                other => tracing::debug!(branch, attr = other, "ignoring unknown attribute"),
            }
        }

        let mut child_index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (branch, node) in &nodes {
            if let Some(parent) = &node.parent {
                child_index
                    .entry(parent.clone())
                    .or_default()
                    .insert(branch.clone());
            }
        }

        tracing::debug!(tracked = nodes.len(), trunk, "loaded stack graph");

        Ok(Self {
            store,
            trunk: trunk.to_string(),
            nodes,
            child_index,
            live: live_branches.into_iter().collect(),
        })
    }

    /// Point `branch` at `parent` in the in-memory map and the child index.
    fn relink(&mut self, branch: &str, parent: Option<&str>) {
        let node = self.nodes.entry(branch.to_string()).or_default();
        if let Some(old) = node.parent.take() {
            if let Some(siblings) = self.child_index.get_mut(&old) {
                siblings.remove(branch);
                if siblings.is_empty() {
                    self.child_index.remove(&old);
                }
            }
        }
        if let Some(parent) = parent {
            node.parent = Some(parent.to_string());
            self.child_index
                .entry(parent.to_string())
                .or_default()
                .insert(branch.to_string());
        }
    }

    pub fn trunk(&self) -> &str {
        &self.trunk
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn is_tracked(&self, branch: &str) -> bool {
        self.parent(branch).is_some()
    }

    /// Whether the branch exists locally as far as this graph knows.
    pub fn is_live(&self, branch: &str) -> bool {
        self.live.contains(branch)
    }

    pub fn parent(&self, branch: &str) -> Option<&str> {
        self.nodes.get(branch)?.parent.as_deref()
    }

    pub fn parent_rev(&self, branch: &str) -> Option<&str> {
        self.nodes.get(branch)?.parent_rev.as_deref()
    }

    pub fn review_id(&self, branch: &str) -> Option<u64> {
        self.nodes.get(branch)?.review
    }

    /// Tracked, existing branches in name order.
    pub fn tracked_branches(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(name, node)| node.parent.is_some() && self.live.contains(*name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Existing branches whose recorded parent is `branch`.
    pub fn children(&self, branch: &str) -> Vec<String> {
        self.child_index
            .get(branch)
            .into_iter()
            .flatten()
            .filter(|name| self.live.contains(*name))
            .cloned()
            .collect()
    }

    /// The branch stacked directly on `branch`. Stacks are linear, so for any
    /// branch other than trunk there is at most one.
    pub fn child(&self, branch: &str) -> Option<String> {
        self.children(branch).into_iter().next()
    }

    /// Record `parent` as the parent of `child`. Rejects cycles and a second
    /// child on a stacked branch. The parent revision is left untouched.
    pub fn set_parent(&mut self, child: &str, parent: &str) -> Result<()> {
        if child == self.trunk {
            return Err(StackError::UserInput(format!(
                "'{}' is the trunk branch and cannot be stacked",
                child
            ))
            .into());
        }
        if child == parent {
            return Err(StackError::CorruptGraph(format!(
                "'{}' cannot be its own parent",
                child
            ))
            .into());
        }

        // Walk up from the new parent; reaching the child means a cycle.
        let limit = self.nodes.len() + 1;
        let mut cursor = Some(parent.to_string());
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == child {
                return Err(StackError::CorruptGraph(format!(
                    "making '{}' the parent of '{}' would create a cycle",
                    parent, child
                ))
                .into());
            }
            if current == self.trunk || steps > limit {
                break;
            }
            cursor = self.parent(&current).map(str::to_string);
            steps += 1;
        }

        if parent != self.trunk {
            if let Some(existing) = self.children(parent).into_iter().find(|c| c != child) {
                return Err(StackError::UserInput(format!(
                    "'{}' already has '{}' stacked on it; use `stk insert` to add a branch in between",
                    parent, existing
                ))
                .into());
            }
        }

        self.store.set(&key(child, "parent"), parent)?;
        self.relink(child, Some(parent));
        self.live.insert(child.to_string());
        tracing::debug!(child, parent, "set parent");
        Ok(())
    }

    /// Forget the parent of `branch` (and its parent revision), keeping any
    /// review link.
    pub fn clear_parent(&mut self, branch: &str) -> Result<()> {
        self.store.unset(&key(branch, "parent"))?;
        self.store.unset(&key(branch, "parentrev"))?;
        if self.nodes.contains_key(branch) {
            self.relink(branch, None);
        }
        if let Some(node) = self.nodes.get_mut(branch) {
            node.parent_rev = None;
        }
        Ok(())
    }

    pub fn set_parent_rev(&mut self, branch: &str, rev: &str) -> Result<()> {
        self.store.set(&key(branch, "parentrev"), rev)?;
        self.nodes.entry(branch.to_string()).or_default().parent_rev = Some(rev.to_string());
        Ok(())
    }

    pub fn set_review_id(&mut self, branch: &str, id: Option<u64>) -> Result<()> {
        match id {
            Some(id) => self.store.set(&key(branch, "review"), &id.to_string())?,
            None => self.store.unset(&key(branch, "review"))?,
        }
        self.nodes.entry(branch.to_string()).or_default().review = id;
        Ok(())
    }

    /// Remove everything recorded for `branch`, including its review link.
    pub fn untrack(&mut self, branch: &str) -> Result<()> {
        for attr in ["parent", "parentrev", "review"] {
            self.store.unset(&key(branch, attr))?;
        }
        self.relink(branch, None);
        self.nodes.remove(branch);
        self.live.remove(branch);
        tracing::debug!(branch, "untracked");
        Ok(())
    }

    fn step_limit(&self) -> usize {
        self.nodes.len() + 1
    }

    /// Follow child links upward until a branch has no child.
    pub fn stack_top(&self, branch: &str) -> Result<String> {
        let mut current = branch.to_string();
        let mut steps = 0;
        while let Some(child) = self.child(&current) {
            steps += 1;
            if steps > self.step_limit() {
                return Err(StackError::CorruptGraph(format!(
                    "child chain above '{}' does not terminate",
                    branch
                ))
                .into());
            }
            current = child;
        }
        Ok(current)
    }

    /// Follow parent links down until the parent is trunk or missing.
    pub fn stack_bottom(&self, branch: &str) -> Result<String> {
        let mut current = branch.to_string();
        let mut steps = 0;
        while let Some(parent) = self.parent(&current) {
            if parent == self.trunk || !self.live.contains(parent) {
                break;
            }
            steps += 1;
            if steps > self.step_limit() {
                return Err(StackError::CorruptGraph(format!(
                    "parent chain below '{}' does not terminate",
                    branch
                ))
                .into());
            }
            current = parent.to_string();
        }
        Ok(current)
    }

    /// The whole stack containing `branch`, bottom to top, trunk excluded.
    /// Empty when `branch` is not tracked.
    pub fn full_stack(&self, branch: &str) -> Result<Vec<String>> {
        if !self.is_tracked(branch) {
            return Ok(Vec::new());
        }

        let top = self.stack_top(branch)?;
        let mut stack = vec![top.clone()];
        let mut current = top;
        while let Some(parent) = self.parent(&current) {
            if parent == self.trunk {
                break;
            }
            if !self.live.contains(parent) {
                tracing::warn!(branch = %current, parent, "parent branch no longer exists");
                break;
            }
            if stack.len() > self.step_limit() {
                return Err(StackError::CorruptGraph(format!(
                    "parent chain below '{}' does not terminate",
                    current
                ))
                .into());
            }
            stack.push(parent.to_string());
            current = parent.to_string();
        }
        stack.reverse();
        Ok(stack)
    }

    /// Branches strictly above `branch`, bottom to top.
    pub fn upstack(&self, branch: &str) -> Result<Vec<String>> {
        let mut above = Vec::new();
        let mut current = branch.to_string();
        while let Some(child) = self.child(&current) {
            if above.len() > self.step_limit() {
                return Err(StackError::CorruptGraph(format!(
                    "child chain above '{}' does not terminate",
                    branch
                ))
                .into());
            }
            above.push(child.clone());
            current = child;
        }
        Ok(above)
    }

    /// Bottoms of all stacks: children of trunk that have something stacked
    /// on them. A lone branch off trunk is not a stack.
    pub fn all_stack_roots(&self) -> Vec<String> {
        self.children(&self.trunk)
            .into_iter()
            .filter(|root| self.child(root).is_some())
            .collect()
    }
}
