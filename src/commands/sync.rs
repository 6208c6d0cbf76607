use crate::commands::Session;
use crate::engine::sync_stacks;
use crate::github::GitHubService;
use crate::review::ReviewService;
use anyhow::Result;
use colored::Colorize;

/// Sync with the remote: update trunk, drop merged branches from their
/// stacks, rebase the survivors and delete what merged.
pub fn run(assume_yes: bool) -> Result<()> {
    let mut session = Session::open(assume_yes)?;
    session.require_clean()?;
    session.require_idle()?;

    let remote = session.remote_name()?;

    let service = match GitHubService::connect(&session.repo, &session.config) {
        Ok(service) => service,
        Err(err) => {
            tracing::warn!(error = %err, "review service unavailable; using ancestry only");
            None
        }
    };
    let review: Option<&dyn ReviewService> = service.as_ref().map(|s| s as &dyn ReviewService);

    println!("{}", "Syncing repository...".bold());
    let confirmer = session.confirmer();
    let report = sync_stacks(
        &session.repo,
        &mut session.graph,
        review,
        &remote,
        &confirmer,
        assume_yes,
    )?;

    println!();
    println!("{}", "Sync complete!".green().bold());
    session.print_push_hint(&report.remaining())?;

    Ok(())
}
