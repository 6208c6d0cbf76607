use crate::commands::Session;
use crate::error::StackError;
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;

/// Create `name` on top of the current branch and track it.
pub fn run(name: String, message: Option<String>) -> Result<()> {
    let mut session = Session::open(false)?;
    let current = session.current_branch()?;
    let trunk = session.trunk();

    super::require_new_branch(&session, &name)?;

    if current != trunk {
        session.require_tracked(&current)?;
        if let Some(child) = session.graph.child(&current) {
            return Err(StackError::UserInput(format!(
                "'{}' already has '{}' stacked on it. Use `stk insert {}` to add a branch in between.",
                current, child, name
            ))
            .into());
        }
    }

    session.repo.create_branch(&name, &current)?;
    session.graph.set_parent(&name, &current)?;
    let parent_rev = session.repo.branch_commit(&current)?;
    session.graph.set_parent_rev(&name, &parent_rev)?;
    session.repo.checkout(&name)?;

    println!(
        "Created and switched to branch '{}' (stacked on {})",
        name.green(),
        current.blue()
    );

    if let Some(msg) = message {
        super::commit_all(&session, &msg)?;
    }

    Ok(())
}
