use crate::commands::Session;
use crate::engine::{OpJournal, RebaseStep};
use crate::error::StackError;
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;

/// Amend the tip commit with every working tree change, then carry the
/// branches above along.
pub fn run(message: Option<String>) -> Result<()> {
    let mut session = Session::open(false)?;
    let current = session.current_branch()?;
    let parent = session.require_tracked(&current)?;
    session.require_idle()?;

    // HEAD would be the parent's commit
    if session.repo.commit_count(&parent, &current)? == 0 {
        return Err(StackError::UserInput(format!(
            "'{}' has no commits of its own to amend; commit first",
            current
        ))
        .into());
    }

    let old_tip = session.repo.branch_commit(&current)?;
    session.repo.stage_all()?;
    if !session.repo.has_staged_changes()? && message.is_none() {
        println!("{}", "No changes to amend.".yellow());
        return Ok(());
    }
    session.repo.amend(message.as_deref())?;
    println!("{} '{}'", "✓ Amended".green(), current.cyan());

    let upstack = session.graph.upstack(&current)?;
    if upstack.is_empty() {
        return Ok(());
    }

    let mut steps = vec![RebaseStep::with_upstream(upstack[0].clone(), old_tip)];
    steps.extend(upstack[1..].iter().map(RebaseStep::new));

    println!("Restacking {} branch(es) above '{}'...", upstack.len(), current);
    session.execute(OpJournal::new("amend", &current).with_steps(steps))?;
    println!("{}", "✓ Stack is consistent".green());

    let mut changed = vec![current];
    changed.extend(upstack);
    session.print_push_hint(&changed)?;

    Ok(())
}
