use crate::commands::Session;
use crate::error::StackError;
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Select};

/// Record a parent for the current branch.
pub fn run(parent: Option<String>) -> Result<()> {
    let mut session = Session::open(false)?;
    let current = session.current_branch()?;
    let trunk = session.trunk();

    if current == trunk {
        return Err(StackError::UserInput(format!(
            "'{}' is the trunk branch and cannot be tracked",
            current
        ))
        .into());
    }

    let parent_branch = match parent {
        Some(p) => {
            if !session.repo.branch_exists(&p) {
                return Err(StackError::UserInput(format!("Branch '{}' does not exist", p)).into());
            }
            p
        }
        None => select_parent(&session, &current, &trunk)?,
    };

    if parent_branch == current {
        return Err(StackError::UserInput("A branch cannot be its own parent".to_string()).into());
    }

    let Some(merge_base) = session.repo.merge_base(&parent_branch, &current)? else {
        return Err(StackError::UserInput(format!(
            "'{}' and '{}' have unrelated histories",
            current, parent_branch
        ))
        .into());
    };

    let current_tip = session.repo.branch_commit(&current)?;
    let parent_tip = session.repo.branch_commit(&parent_branch)?;
    if current_tip != parent_tip && session.repo.is_ancestor(&current, &parent_branch)? {
        return Err(StackError::UserInput(format!(
            "'{}' already contains '{}'; it cannot be its parent",
            parent_branch, current
        ))
        .into());
    }

    if let Some(existing) = session.graph.parent(&current) {
        println!(
            "Branch '{}' was tracked on '{}'; moving it to '{}'.",
            current.yellow(),
            existing.blue(),
            parent_branch.blue()
        );
    }

    session.graph.set_parent(&current, &parent_branch)?;
    session.graph.set_parent_rev(&current, &merge_base)?;

    println!(
        "✓ Tracking '{}' with parent '{}'",
        current.green(),
        parent_branch.blue()
    );
    if merge_base != parent_tip {
        println!(
            "{}",
            format!("'{}' is behind '{}'; run `stk restack` from '{}'.", current, parent_branch, parent_branch)
                .yellow()
        );
    }

    Ok(())
}

fn select_parent(session: &Session, current: &str, trunk: &str) -> Result<String> {
    let mut branches = session.repo.list_branches()?;
    branches.retain(|b| b != current);
    branches.sort();

    // Put trunk first as the recommended default
    if let Some(pos) = branches.iter().position(|b| b == trunk) {
        branches.remove(pos);
        branches.insert(0, trunk.to_string());
    }

    if branches.is_empty() {
        return Err(StackError::UserInput("No branches available to be parent".to_string()).into());
    }

    let items: Vec<String> = branches
        .iter()
        .enumerate()
        .map(|(i, b)| {
            if i == 0 {
                format!("{} (recommended)", b)
            } else {
                b.clone()
            }
        })
        .collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Select parent branch for '{}'", current))
        .items(&items)
        .default(0)
        .interact()?;

    Ok(branches[selection].clone())
}
