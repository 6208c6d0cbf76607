use crate::commands::Session;
use crate::engine::journal::steps_for;
use crate::engine::OpJournal;
use crate::error::StackError;
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;

/// Create `name` between the current branch and its child, then restack
/// everything above it.
pub fn run(name: String, message: Option<String>) -> Result<()> {
    let mut session = Session::open(false)?;
    let current = session.current_branch()?;

    if current == session.trunk() {
        return Err(StackError::UserInput(
            "Cannot insert above trunk; use `stk create` to start a new stack".to_string(),
        )
        .into());
    }
    session.require_tracked(&current)?;
    super::require_new_branch(&session, &name)?;
    session.require_idle()?;

    let child = session.graph.child(&current);
    if child.is_some() && message.is_none() {
        session.require_clean()?;
    }

    session.repo.create_branch(&name, &current)?;
    session.repo.checkout(&name)?;
    // Re-link the child first so `current` never has two children
    if let Some(child) = &child {
        session.graph.set_parent(child, &name)?;
    }
    session.graph.set_parent(&name, &current)?;
    let parent_rev = session.repo.branch_commit(&current)?;
    session.graph.set_parent_rev(&name, &parent_rev)?;

    println!(
        "Inserted '{}' between '{}' and '{}'",
        name.green(),
        current.blue(),
        child.as_deref().unwrap_or("(top)").blue()
    );

    if let Some(msg) = message {
        super::commit_all(&session, &msg)?;
    }

    let upstack = session.graph.upstack(&name)?;
    if upstack.is_empty() {
        return Ok(());
    }

    println!("Restacking {} branch(es) above '{}'...", upstack.len(), name);
    let journal = OpJournal::new("insert", &name).with_steps(steps_for(&upstack));
    session.execute(journal)?;
    println!("{}", "✓ Stack is consistent".green());
    session.print_push_hint(&upstack)?;

    Ok(())
}
