use crate::commands::Session;
use crate::error::StackError;
use anyhow::Result;
use colored::Colorize;

/// Forget a branch's place in its stack. The branch itself is left alone.
pub fn run(branch: Option<String>) -> Result<()> {
    let mut session = Session::open(false)?;
    let target = match branch {
        Some(b) => b,
        None => session.current_branch()?,
    };

    session.require_tracked(&target)?;

    if let Some(child) = session.graph.child(&target) {
        return Err(StackError::precondition(
            format!("'{}' has '{}' stacked on it.", target, child),
            format!("run `stk delete {}` or re-track '{}' first", target, child),
        )
        .into());
    }

    session.graph.untrack(&target)?;
    println!("✓ Stopped tracking '{}'", target.green());
    Ok(())
}
