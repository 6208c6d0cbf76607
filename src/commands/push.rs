use crate::commands::Session;
use crate::engine::push::needs_push;
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;

/// Force-push (with lease) the branches of the current stack that differ
/// from the remote. Returns the branches pushed.
pub fn push_stack(session: &Session, stack: &[String]) -> Result<Vec<String>> {
    let remote = session.remote_name()?;
    let stale = needs_push(&session.repo, &remote, stack)?;
    if stale.is_empty() {
        return Ok(stale);
    }

    for branch in &stale {
        println!("  {} {}", "pushing".cyan(), branch);
    }
    session.repo.push_force_with_lease(&remote, &stale)?;
    Ok(stale)
}

pub fn run() -> Result<()> {
    let session = Session::open(false)?;
    let current = session.current_branch()?;
    session.require_tracked(&current)?;
    session.require_idle()?;

    let stack = session.graph.full_stack(&current)?;
    let pushed = push_stack(&session, &stack)?;
    if pushed.is_empty() {
        println!("{}", "Everything up to date.".dimmed());
    } else {
        println!("{}", format!("✓ Pushed {} branch(es)", pushed.len()).green());
    }
    Ok(())
}
