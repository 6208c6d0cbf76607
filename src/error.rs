use thiserror::Error;

/// Failures the stack engine reports to the operator.
///
/// Everything else (I/O, git plumbing, HTTP) travels as a plain
/// `anyhow::Error`; these variants are the ones `main` inspects to pick
/// an exit code or print a hint.
#[derive(Debug, Error)]
pub enum StackError {
    /// The request itself is invalid: unknown branch, duplicate name, trunk
    /// used where a stacked branch is required.
    #[error("{0}")]
    UserInput(String),

    /// Repository state does not allow the command to start.
    #[error("{message}")]
    Precondition { message: String, hint: String },

    /// A rebase stopped on conflicts. The journal is left in place for
    /// `stk continue`.
    #[error("rebase of '{branch}' stopped on a conflict")]
    ConflictPaused { branch: String },

    /// The review service rejected or failed a request.
    #[error("review service error: {0}")]
    RemoteService(String),

    /// Stored relationships are inconsistent (cycle, runaway chain).
    #[error("stack metadata is corrupt: {0}")]
    CorruptGraph(String),
}

impl StackError {
    pub fn precondition(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConflictPaused { .. } => 2,
            _ => 1,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Precondition { hint, .. } if !hint.is_empty() => Some(hint),
            _ => None,
        }
    }
}
