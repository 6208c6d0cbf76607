mod config;
mod repo;
mod vcs;

pub use config::GitConfigStore;
pub use repo::GitRepo;
pub use vcs::{RebaseResult, Vcs};
