use crate::commands::Session;
use crate::engine::push::needs_push;
use crate::engine::{find_divergence, OpJournal};
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct BranchStatus {
    name: String,
    parent: String,
    commits: usize,
    needs_restack: bool,
    needs_push: bool,
    review: Option<u64>,
}

#[derive(Debug, Serialize)]
struct OperationStatus {
    command: String,
    completed: usize,
    total: usize,
    started: String,
    pending_deletions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    trunk: String,
    current: String,
    tracked: bool,
    stack: Vec<BranchStatus>,
    divergence: Option<String>,
    operation: Option<OperationStatus>,
}

pub fn run(json: bool) -> Result<()> {
    let session = Session::open(false)?;
    let report = collect(&session)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn collect(session: &Session) -> Result<StatusReport> {
    // Mid-rebase HEAD is detached; fall back to the journal's origin
    let journal = OpJournal::read(session.graph.store())?;
    let current = match session.current_branch() {
        Ok(branch) => branch,
        Err(_) => match &journal {
            Some(j) => j.origin.clone(),
            None => session.trunk(),
        },
    };

    let stack = session.graph.full_stack(&current)?;
    let remote = session.remote_name().ok();
    let stale = match &remote {
        Some(remote) => needs_push(&session.repo, remote, &stack)?,
        None => Vec::new(),
    };

    let mut branches = Vec::new();
    for name in &stack {
        let parent = session.graph.parent(name).unwrap_or_default().to_string();
        branches.push(BranchStatus {
            commits: session.repo.commit_count(&parent, name)?,
            needs_restack: !session.repo.is_ancestor(&parent, name)?,
            needs_push: stale.contains(name),
            review: session.graph.review_id(name),
            name: name.clone(),
            parent,
        });
    }

    Ok(StatusReport {
        trunk: session.trunk(),
        tracked: session.graph.is_tracked(&current),
        current,
        divergence: find_divergence(&session.repo, &stack)?,
        stack: branches,
        operation: journal.map(|j| OperationStatus {
            completed: j.cursor,
            total: j.steps.len(),
            command: j.command,
            started: j.started,
            pending_deletions: j.pending_deletions,
        }),
    })
}

fn print_report(report: &StatusReport) {
    if let Some(op) = &report.operation {
        println!(
            "{}",
            format!(
                "`stk {}` paused at step {} of {} (started {})",
                op.command,
                op.completed + 1,
                op.total,
                op.started
            )
            .yellow()
        );
        println!("Resolve conflicts, then run {}.", "stk continue".cyan());
        println!();
    }

    if !report.tracked {
        if report.current == report.trunk {
            println!("On trunk {}.", report.trunk.bright_blue().bold());
        } else {
            println!("{}", format!("'{}' is not tracked.", report.current).dimmed());
            println!("Use {} to add it to a stack.", "stk track".cyan());
        }
        return;
    }

    for branch in report.stack.iter().rev() {
        let marker = if branch.name == report.current {
            "◉".bright_green().bold()
        } else {
            "○".bright_cyan()
        };
        let mut badges = format!(" {} commit(s)", branch.commits).dimmed().to_string();
        if branch.needs_restack {
            badges.push_str(&" [needs restack]".bright_yellow().to_string());
        }
        if branch.needs_push {
            badges.push_str(&" [needs push]".bright_yellow().to_string());
        }
        if let Some(id) = branch.review {
            badges.push_str(&format!(" PR #{}", id).bright_magenta().to_string());
        }
        println!("{} {}{}", marker, branch.name, badges);
    }
    println!("{} {}", "○".bright_blue(), report.trunk.bright_blue().bold());
    println!();

    match &report.divergence {
        Some(point) => println!(
            "{}",
            format!("Stack diverges above '{}'; run `stk restack`.", point).bright_yellow()
        ),
        None => println!("{}", "✓ Stack is consistent".green()),
    }
    if report.stack.iter().any(|b| b.needs_push) {
        println!("Run {} to update the remote.", "stk push".cyan());
    }
}
