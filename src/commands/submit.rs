use crate::commands::push::push_stack;
use crate::commands::Session;
use crate::engine::find_divergence;
use crate::error::StackError;
use crate::github::GitHubService;
use crate::review::ReviewService;
use anyhow::Result;
use colored::Colorize;

/// Push the current stack and open or retarget one pull request per branch,
/// each based on the branch below it.
pub fn run(draft: bool) -> Result<()> {
    let mut session = Session::open(false)?;
    let current = session.current_branch()?;
    session.require_tracked(&current)?;
    session.require_idle()?;

    let stack = session.graph.full_stack(&current)?;
    if stack.is_empty() {
        println!("{}", "No tracked branches to submit.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        "Validating that this stack is ready to submit...".yellow()
    );
    if let Some(point) = find_divergence(&session.repo, &stack)? {
        return Err(StackError::precondition(
            format!("The stack is out of date above '{}'.", point),
            "run `stk restack` first",
        )
        .into());
    }

    let service = GitHubService::require(&session.repo, &session.config)?;
    let draft = draft || session.config.submit.draft;

    println!();
    println!("Pushing branches...");
    let pushed = push_stack(&session, &stack)?;
    if pushed.is_empty() {
        println!("  {}", "all branches already on remote".dimmed());
    }

    println!();
    println!("Creating/updating PRs...");
    for branch in &stack {
        let Some(parent) = session.graph.parent(branch).map(str::to_string) else {
            continue;
        };

        let existing = match session.graph.review_id(branch) {
            Some(id) => Some(id),
            None => service.find_open_request(branch)?.map(|r| r.id),
        };

        let id = match existing {
            Some(id) => {
                service.update_request_base(id, &parent)?;
                println!(
                    "  {} {} {}",
                    "▸".white(),
                    branch,
                    format!("updated #{} (base: {})", id, parent).dimmed()
                );
                id
            }
            None => {
                let title = session.repo.commit_subject(branch)?;
                let request = service.create_request(branch, &parent, &title, draft)?;
                println!(
                    "  {} {} {}",
                    "▸".white(),
                    branch,
                    format!("created #{}", request.id).green()
                );
                request.id
            }
        };
        session.graph.set_review_id(branch, Some(id))?;
    }

    println!();
    println!("{}", "✓ Stack submitted successfully!".green());
    for branch in &stack {
        if let Some(id) = session.graph.review_id(branch) {
            println!("  {} {}", branch.cyan(), service.request_url(id));
        }
    }

    Ok(())
}
