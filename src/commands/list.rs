use crate::commands::Session;
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;

/// Print every stack, top of each stack first, trunk at the bottom.
pub fn run() -> Result<()> {
    let session = Session::open(false)?;
    let current = session.current_branch()?;
    let trunk = session.trunk();

    let roots = session.graph.children(&trunk);
    if roots.is_empty() {
        println!("{}", "No tracked branches.".dimmed());
        println!("Use {} to start a stack.", "stk create <name>".cyan());
        return Ok(());
    }

    let current_root = if session.graph.is_tracked(&current) {
        session.graph.stack_bottom(&current).ok()
    } else {
        None
    };

    let mut needs_restack = 0;
    for root in &roots {
        let is_current_stack = current_root.as_ref() == Some(root);
        needs_restack += render_stack(&session, root, &current, is_current_stack)?;
    }

    let indicator = "○".bright_blue();
    if current_root.is_some() {
        print!("{}{}", indicator, "─┘".bright_black());
    } else {
        print!("{}{} ", indicator, "┘".bright_black());
    }
    if trunk == current {
        println!(" {}", trunk.bright_green().bold());
    } else {
        println!(" {}", trunk.bright_blue().bold());
    }

    let stacks = session.graph.all_stack_roots().len();
    println!();
    println!(
        "{}",
        format!(
            "{} stack(s), {} single branch(es)",
            stacks,
            roots.len() - stacks
        )
        .dimmed()
    );
    if needs_restack > 0 {
        println!(
            "{}",
            format!("!  {} branch(es) need restacking", needs_restack).bright_yellow()
        );
        println!("Run {} to rebase the stack.", "stk restack".bright_cyan());
    }

    Ok(())
}

/// Render one stack and return how many of its branches are behind their
/// parent.
fn render_stack(session: &Session, root: &str, current: &str, is_current_stack: bool) -> Result<usize> {
    let mut branches = vec![root.to_string()];
    branches.extend(session.graph.upstack(root)?);

    let mut behind = 0;
    for branch in branches.iter().rev() {
        let is_current = branch == current;
        let indicator = if is_current {
            "◉".bright_green().bold()
        } else {
            "○".bright_cyan()
        };
        let name = if is_current {
            branch.bright_green().bold()
        } else {
            branch.bright_cyan()
        };

        let mut badges = String::new();
        if let Some(parent) = session.graph.parent(branch) {
            if !session.repo.is_ancestor(parent, branch)? {
                badges.push_str(&" [needs restack]".bright_yellow().to_string());
                behind += 1;
            }
        }
        if let Some(id) = session.graph.review_id(branch) {
            badges.push_str(&format!(" PR #{}", id).bright_magenta().to_string());
        }

        if is_current_stack {
            print!("{}", "│".bright_blue());
        } else {
            print!(" ");
        }
        println!(" {} {}{}", indicator, name, badges);
    }
    Ok(behind)
}
