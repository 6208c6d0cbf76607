use crate::commands::Session;
use crate::engine::OpJournal;
use crate::error::StackError;
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;

/// Resume the operation that stopped on a conflict, once the operator has
/// finished the paused rebase.
pub fn run(assume_yes: bool) -> Result<()> {
    let mut session = Session::open(assume_yes)?;

    if session.repo.rebase_in_progress()? {
        return Err(StackError::precondition(
            "A git rebase is still in progress.",
            "resolve the conflicts, `git add` the files and run `git rebase --continue`, then `stk continue`",
        )
        .into());
    }

    let Some(journal) = OpJournal::read(session.graph.store())? else {
        println!("{}", "Nothing to continue.".yellow());
        return Ok(());
    };

    println!(
        "Resuming `stk {}` ({} of {} branches done)...",
        journal.command,
        journal.cursor,
        journal.steps.len()
    );
    session.resume(journal)?;
    println!("{}", "✓ Stack is consistent".green());

    let current = session.current_branch()?;
    if session.graph.is_tracked(&current) {
        let stack = session.graph.full_stack(&current)?;
        session.print_push_hint(&stack)?;
    }

    Ok(())
}
