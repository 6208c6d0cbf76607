use crate::commands::Session;
use crate::engine::journal::steps_for;
use crate::engine::{find_divergence, OpJournal};
use anyhow::Result;
use colored::Colorize;

/// Repair the current stack from its first broken link upward.
pub fn run(assume_yes: bool) -> Result<()> {
    let mut session = Session::open(assume_yes)?;
    let current = session.current_branch()?;
    session.require_tracked(&current)?;
    session.require_clean()?;
    session.require_idle()?;

    let stack = session.graph.full_stack(&current)?;
    let Some(point) = find_divergence(&session.repo, &stack)? else {
        println!("{}", "✓ Stack is up to date.".green());
        return Ok(());
    };

    let branches = session.graph.upstack(&point)?;
    println!(
        "Restacking {} branch(es) above '{}'...",
        branches.len().to_string().cyan(),
        point.cyan()
    );

    let journal = OpJournal::new("restack", &current).with_steps(steps_for(&branches));
    let report = session.execute(journal)?;

    println!(
        "{}",
        format!(
            "✓ Stack is consistent ({} rebased, {} already up to date)",
            report.rebased.len(),
            report.skipped.len()
        )
        .green()
    );
    session.print_push_hint(&stack)?;

    Ok(())
}
