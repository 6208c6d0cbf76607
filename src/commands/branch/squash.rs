use crate::commands::Session;
use crate::engine::{OpJournal, RebaseStep};
use crate::error::StackError;
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;

/// Squash all commits on the current branch into a single commit
pub fn run(message: Option<String>) -> Result<()> {
    let mut session = Session::open(false)?;
    let current = session.current_branch()?;
    let parent = session.require_tracked(&current)?;
    session.require_clean()?;
    session.require_idle()?;

    if !session.repo.is_ancestor(&parent, &current)? {
        return Err(StackError::precondition(
            format!("'{}' is not based on the tip of '{}'.", current, parent),
            "run `stk restack` first",
        )
        .into());
    }

    let commit_count = session.repo.commit_count(&parent, &current)?;
    if commit_count == 0 {
        println!("{}", "No commits to squash.".yellow());
        return Ok(());
    }
    if commit_count == 1 && message.is_none() {
        println!("{}", "Only one commit on this branch, nothing to squash.".yellow());
        return Ok(());
    }

    println!(
        "Squashing {} commits on '{}' (parent: '{}')",
        commit_count.to_string().cyan(),
        current.cyan(),
        parent.dimmed()
    );

    let message = match message {
        Some(m) => m,
        None => session
            .repo
            .commits_between(&parent, &current)?
            .join("\n\n"),
    };

    let old_tip = session.repo.branch_commit(&current)?;
    session.repo.reset_soft(&parent)?;
    session.repo.commit(&message)?;
    println!("{}", "✓ Squashed into one commit".green());

    let upstack = session.graph.upstack(&current)?;
    if upstack.is_empty() {
        return Ok(());
    }

    // The first child still contains the pre-squash commits; replay only
    // what comes after the old tip.
    let mut steps = vec![RebaseStep::with_upstream(upstack[0].clone(), old_tip)];
    steps.extend(upstack[1..].iter().map(RebaseStep::new));

    println!("Restacking {} branch(es) above '{}'...", upstack.len(), current);
    session.execute(OpJournal::new("squash", &current).with_steps(steps))?;
    println!("{}", "✓ Stack is consistent".green());
    session.print_push_hint(&upstack)?;

    Ok(())
}
