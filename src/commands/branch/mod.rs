pub mod create;
pub mod delete;
pub mod insert;
pub mod squash;
pub mod track;
pub mod untrack;

use super::Session;
use crate::error::StackError;
use crate::git::Vcs;
use anyhow::Result;
use colored::Colorize;
use regex::Regex;

/// Reject names git would refuse (`git check-ref-format --branch`), plus ':'
/// which the operation journal uses as a separator.
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = Regex::new(r"[\s~^:?*\[\\]|\.\.|@\{|//|^[-/.]|[/.]$|\.lock$")?;
    if name.is_empty() || name == "@" || invalid.is_match(name) {
        return Err(StackError::UserInput(format!("'{}' is not a valid branch name", name)).into());
    }
    Ok(())
}

pub(crate) fn require_new_branch(session: &Session, name: &str) -> Result<()> {
    validate_branch_name(name)?;
    if session.repo.branch_exists(name) {
        return Err(StackError::UserInput(format!("Branch '{}' already exists", name)).into());
    }
    Ok(())
}

/// Stage everything and commit it on the checked-out branch.
pub(crate) fn commit_all(session: &Session, message: &str) -> Result<()> {
    session.repo.stage_all()?;
    if session.repo.has_staged_changes()? {
        session.repo.commit(message)?;
        println!("Committed: {}", message.cyan());
    } else {
        println!("{}", "No changes to commit".dimmed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_branch_names() {
        for name in ["feature", "user/feature-1", "fix_2.0", "release.v1"] {
            assert!(validate_branch_name(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_invalid_branch_names() {
        for name in [
            "", "has space", "a..b", "-lead", "trail/", "x.lock", "a:b", "q?", "at@{1}", "a//b",
        ] {
            assert!(validate_branch_name(name).is_err(), "{}", name);
        }
    }
}
