//! In-memory stand-ins for git and the review host.
//!
//! `FakeVcs` models history as single-parent commits carrying a patch label.
//! Rebasing replays patch labels, dropping ones the new base already has,
//! which is enough to observe which commits a chain rebase moves or drops.

use crate::git::{RebaseResult, Vcs};
use crate::review::{RequestStatus, ReviewRequest, ReviewService};
use anyhow::{anyhow, bail, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone)]
struct FakeCommit {
    parent: Option<String>,
    patch: String,
}

#[derive(Debug)]
struct PendingRebase {
    branch: String,
    onto: String,
    patches: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    commits: HashMap<String, FakeCommit>,
    branches: BTreeMap<String, String>,
    remote: BTreeMap<String, String>,
    head: String,
    next_id: usize,
    conflicts: HashSet<String>,
    rebasing: Option<PendingRebase>,
    dirty: bool,
    rebased: Vec<String>,
    pushed: Vec<String>,
}

impl FakeState {
    fn new_commit(&mut self, parent: Option<String>, patch: &str) -> String {
        self.next_id += 1;
        let id = format!("c{:04}", self.next_id);
        self.commits.insert(
            id.clone(),
            FakeCommit {
                parent,
                patch: patch.to_string(),
            },
        );
        id
    }

    fn resolve(&self, refname: &str) -> Result<String> {
        if let Some(id) = self.branches.get(refname) {
            return Ok(id.clone());
        }
        if let Some(id) = self.remote.get(refname) {
            return Ok(id.clone());
        }
        if self.commits.contains_key(refname) {
            return Ok(refname.to_string());
        }
        bail!("unknown ref '{}'", refname)
    }

    /// Commit ids from `id` back to the root, tip first.
    fn history(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = Some(id.to_string());
        while let Some(current) = cursor {
            cursor = self.commits.get(&current).and_then(|c| c.parent.clone());
            out.push(current);
        }
        out
    }

    fn replay(&mut self, onto: &str, patches: &[String]) -> String {
        let existing: HashSet<String> = self
            .history(onto)
            .iter()
            .map(|id| self.commits[id].patch.clone())
            .collect();
        let mut tip = onto.to_string();
        for patch in patches {
            if existing.contains(patch) {
                continue;
            }
            tip = self.new_commit(Some(tip), patch);
        }
        tip
    }
}

pub struct FakeVcs {
    state: RefCell<FakeState>,
}

impl FakeVcs {
    /// Repository with one root commit on `trunk`, which is checked out.
    pub fn new(trunk: &str) -> Self {
        let mut state = FakeState::default();
        let root = state.new_commit(None, "init");
        state.branches.insert(trunk.to_string(), root);
        state.head = trunk.to_string();
        Self {
            state: RefCell::new(state),
        }
    }

    pub fn add_branch(&self, name: &str, from: &str) {
        let mut state = self.state.borrow_mut();
        let id = state.resolve(from).unwrap();
        state.branches.insert(name.to_string(), id);
    }

    /// Add a commit to `branch` and return its id.
    pub fn commit(&self, branch: &str, patch: &str) -> String {
        let mut state = self.state.borrow_mut();
        let parent = state.branches[branch].clone();
        let id = state.new_commit(Some(parent), patch);
        state.branches.insert(branch.to_string(), id.clone());
        id
    }

    /// Replace the tip commit of `branch` with one carrying `patch`.
    pub fn amend(&self, branch: &str, patch: &str) -> String {
        let mut state = self.state.borrow_mut();
        let tip = state.branches[branch].clone();
        let parent = state.commits[&tip].parent.clone();
        let id = state.new_commit(parent, patch);
        state.branches.insert(branch.to_string(), id.clone());
        id
    }

    pub fn set_remote(&self, name: &str, refname: &str) {
        let mut state = self.state.borrow_mut();
        let id = state.resolve(refname).unwrap();
        state.remote.insert(name.to_string(), id);
    }

    pub fn conflict_on(&self, branch: &str) {
        self.state.borrow_mut().conflicts.insert(branch.to_string());
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.state.borrow_mut().dirty = dirty;
    }

    /// Finish a paused rebase as if the operator resolved it.
    pub fn resolve_conflict(&self) {
        let mut state = self.state.borrow_mut();
        let pending = state.rebasing.take().expect("no rebase in progress");
        let tip = state.replay(&pending.onto, &pending.patches);
        state.branches.insert(pending.branch, tip);
    }

    /// Patch labels on `branch`, oldest first, root excluded.
    pub fn patches(&self, branch: &str) -> Vec<String> {
        let state = self.state.borrow();
        let id = state.resolve(branch).unwrap();
        let mut patches: Vec<String> = state
            .history(&id)
            .iter()
            .map(|c| state.commits[c].patch.clone())
            .filter(|p| p != "init")
            .collect();
        patches.reverse();
        patches
    }

    /// Branches rebased so far, in order.
    pub fn rebased(&self) -> Vec<String> {
        self.state.borrow().rebased.clone()
    }

    pub fn pushed(&self) -> Vec<String> {
        self.state.borrow().pushed.clone()
    }
}

impl Vcs for FakeVcs {
    fn current_branch(&self) -> Result<String> {
        Ok(self.state.borrow().head.clone())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.rebasing.is_some() {
            bail!("cannot checkout during a rebase");
        }
        if !state.branches.contains_key(branch) {
            bail!("no branch '{}'", branch);
        }
        state.head = branch.to_string();
        Ok(())
    }

    fn create_branch(&self, name: &str, from: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.branches.contains_key(name) {
            bail!("branch '{}' exists", name);
        }
        let id = state.resolve(from)?;
        state.branches.insert(name.to_string(), id);
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.head == name {
            bail!("cannot delete the checked out branch '{}'", name);
        }
        state
            .branches
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| anyhow!("no branch '{}'", name))
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.state.borrow().branches.contains_key(name)
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().branches.keys().cloned().collect())
    }

    fn branch_commit(&self, branch: &str) -> Result<String> {
        self.state.borrow().resolve(branch)
    }

    fn remote_commit(&self, remote: &str, branch: &str) -> Result<Option<String>> {
        let name = format!("{}/{}", remote, branch);
        Ok(self.state.borrow().remote.get(&name).cloned())
    }

    fn rebase(&self, onto: &str, upstream: &str) -> Result<RebaseResult> {
        let mut state = self.state.borrow_mut();
        let branch = state.head.clone();
        let tip = state.resolve(&branch)?;
        let onto_id = state.resolve(onto)?;
        let upstream_history: HashSet<String> =
            state.history(&state.resolve(upstream)?).into_iter().collect();

        let mut patches: Vec<String> = state
            .history(&tip)
            .into_iter()
            .take_while(|id| !upstream_history.contains(id))
            .map(|id| state.commits[&id].patch.clone())
            .collect();
        patches.reverse();

        state.rebased.push(branch.clone());
        if state.conflicts.remove(&branch) {
            state.rebasing = Some(PendingRebase {
                branch,
                onto: onto_id,
                patches,
            });
            return Ok(RebaseResult::Conflict);
        }

        let new_tip = state.replay(&onto_id, &patches);
        state.branches.insert(branch, new_tip);
        Ok(RebaseResult::Success)
    }

    fn commit_count(&self, base: &str, head: &str) -> Result<usize> {
        let state = self.state.borrow();
        let base_history: HashSet<String> =
            state.history(&state.resolve(base)?).into_iter().collect();
        Ok(state
            .history(&state.resolve(head)?)
            .iter()
            .filter(|id| !base_history.contains(*id))
            .count())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let state = self.state.borrow();
        let ancestor = state.resolve(ancestor)?;
        Ok(state.history(&state.resolve(descendant)?).contains(&ancestor))
    }

    fn merge_base(&self, left: &str, right: &str) -> Result<Option<String>> {
        let state = self.state.borrow();
        let right_history: HashSet<String> =
            state.history(&state.resolve(right)?).into_iter().collect();
        Ok(state
            .history(&state.resolve(left)?)
            .into_iter()
            .find(|id| right_history.contains(id)))
    }

    fn fetch(&self, _remote: &str) -> Result<()> {
        Ok(())
    }

    fn fast_forward(&self, branch: &str, target: &str) -> Result<bool> {
        if !self.is_ancestor(branch, target)? {
            return Ok(false);
        }
        let mut state = self.state.borrow_mut();
        let id = state.resolve(target)?;
        state.branches.insert(branch.to_string(), id);
        Ok(true)
    }

    fn push_force_with_lease(&self, remote: &str, branches: &[String]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        for branch in branches {
            let id = state.resolve(branch)?;
            state.remote.insert(format!("{}/{}", remote, branch), id);
            state.pushed.push(branch.clone());
        }
        Ok(())
    }

    fn working_tree_is_clean(&self) -> Result<bool> {
        Ok(!self.state.borrow().dirty)
    }

    fn rebase_in_progress(&self) -> Result<bool> {
        Ok(self.state.borrow().rebasing.is_some())
    }
}

#[derive(Debug, Default)]
struct ReviewState {
    statuses: HashMap<u64, RequestStatus>,
    failing: HashSet<u64>,
    failing_bases: HashSet<u64>,
    open_by_branch: HashMap<String, u64>,
    base_updates: Vec<(u64, String)>,
    created: Vec<(String, String)>,
    closed: Vec<u64>,
    next_id: u64,
}

#[derive(Default)]
pub struct FakeReview {
    state: RefCell<ReviewState>,
}

impl FakeReview {
    pub fn new() -> Self {
        let review = Self::default();
        review.state.borrow_mut().next_id = 100;
        review
    }

    pub fn set_status(&self, id: u64, status: RequestStatus) {
        self.state.borrow_mut().statuses.insert(id, status);
    }

    pub fn fail_status(&self, id: u64) {
        self.state.borrow_mut().failing.insert(id);
    }

    pub fn fail_base_update(&self, id: u64) {
        self.state.borrow_mut().failing_bases.insert(id);
    }

    pub fn base_updates(&self) -> Vec<(u64, String)> {
        self.state.borrow().base_updates.clone()
    }

    pub fn created(&self) -> Vec<(String, String)> {
        self.state.borrow().created.clone()
    }

    pub fn closed(&self) -> Vec<u64> {
        self.state.borrow().closed.clone()
    }
}

impl ReviewService for FakeReview {
    fn find_open_request(&self, branch: &str) -> Result<Option<ReviewRequest>> {
        let state = self.state.borrow();
        Ok(state.open_by_branch.get(branch).map(|id| ReviewRequest {
            id: *id,
            status: RequestStatus::Open,
            base: None,
            url: None,
        }))
    }

    fn request_status(&self, id: u64) -> Result<RequestStatus> {
        let state = self.state.borrow();
        if state.failing.contains(&id) {
            bail!("review host unavailable");
        }
        Ok(state
            .statuses
            .get(&id)
            .copied()
            .unwrap_or(RequestStatus::NotFound))
    }

    fn create_request(
        &self,
        head: &str,
        base: &str,
        _title: &str,
        _draft: bool,
    ) -> Result<ReviewRequest> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.statuses.insert(id, RequestStatus::Open);
        state.open_by_branch.insert(head.to_string(), id);
        state.created.push((head.to_string(), base.to_string()));
        Ok(ReviewRequest {
            id,
            status: RequestStatus::Open,
            base: Some(base.to_string()),
            url: None,
        })
    }

    fn update_request_base(&self, id: u64, base: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.failing_bases.contains(&id) {
            bail!("review host rejected the base change for #{}", id);
        }
        state.base_updates.push((id, base.to_string()));
        Ok(())
    }

    fn close_request(&self, id: u64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.statuses.insert(id, RequestStatus::Closed);
        state.closed.push(id);
        Ok(())
    }

    fn request_url(&self, id: u64) -> String {
        format!("https://review.test/pull/{}", id)
    }
}
