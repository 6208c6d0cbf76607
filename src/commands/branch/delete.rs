use crate::commands::Session;
use crate::engine::{OpJournal, RebaseStep};
use crate::error::StackError;
use crate::git::Vcs;
use crate::github::GitHubService;
use crate::review::ReviewService;
use anyhow::Result;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};

/// Remove a branch from the middle of its stack: its child moves onto its
/// parent without the deleted branch's commits, then the branch is deleted.
pub fn run(branch: Option<String>, close_review: bool, assume_yes: bool) -> Result<()> {
    let mut session = Session::open(assume_yes)?;
    let current = session.current_branch()?;
    let target = branch.unwrap_or_else(|| current.clone());

    if target == session.trunk() {
        return Err(StackError::UserInput("Cannot delete the trunk branch".to_string()).into());
    }
    let parent = session.require_tracked(&target)?;
    session.require_clean()?;
    session.require_idle()?;

    if !assume_yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete branch '{}'?", target))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", "Aborted.".red());
            return Ok(());
        }
    }

    let old_tip = session.repo.branch_commit(&target)?;
    let child = session.graph.child(&target);
    let review_id = session.graph.review_id(&target);
    let child_review = child.as_deref().and_then(|c| session.graph.review_id(c));

    let service = if review_id.is_some() || child_review.is_some() {
        GitHubService::connect(&session.repo, &session.config)?
    } else {
        None
    };

    if close_review {
        match (review_id, &service) {
            (Some(id), Some(svc)) => {
                svc.close_request(id)?;
                println!("Closed PR #{}", id);
            }
            (Some(id), None) => {
                println!(
                    "{}",
                    format!("PR #{} left open (no GitHub token).", id).yellow()
                );
            }
            (None, _) => {}
        }
    }

    session.graph.clear_parent(&target)?;

    let mut steps = Vec::new();
    if let Some(child) = &child {
        session.graph.set_parent(child, &parent)?;
        println!("Moved '{}' onto '{}'", child.cyan(), parent.blue());

        if let Some(id) = child_review {
            match &service {
                Some(svc) => {
                    svc.update_request_base(id, &parent)?;
                    println!("Retargeted PR #{} to '{}'", id, parent);
                }
                None => println!(
                    "{}",
                    format!("PR #{} still targets '{}'; update its base manually.", id, target)
                        .yellow()
                ),
            }
        }

        steps.push(RebaseStep::with_upstream(child.clone(), old_tip));
        steps.extend(session.graph.upstack(child)?.iter().map(RebaseStep::new));
    }

    let journal = OpJournal::new("delete", &current)
        .with_deletions(vec![target.clone()], true)
        .with_steps(steps);
    let report = session.execute(journal)?;
    if report.rebased.is_empty() && report.skipped.is_empty() {
        println!("{}", format!("✓ Deleted '{}'", target).green());
    } else {
        println!("{}", "✓ Stack is consistent".green());
        if let Some(child) = &child {
            let moved = session.graph.full_stack(child)?;
            session.print_push_hint(&moved)?;
        }
    }

    Ok(())
}
