use super::GitRepo;
use crate::engine::store::ConfigStore;
use anyhow::{Context, Result};
use git2::{Config, ConfigLevel, ErrorCode};

const TRUNK_KEY: &str = "stk.trunk";
const REMOTE_KEY: &str = "stk.remote";

/// Stack metadata kept in the repository's local git config (`.git/config`).
///
/// libgit2 rewrites the file atomically through a lock file, so each
/// `set`/`unset` is durable on return.
pub struct GitConfigStore {
    config: Config,
}

impl GitConfigStore {
    pub fn open(repo: &GitRepo) -> Result<Self> {
        let config = repo
            .inner()
            .config()
            .context("Failed to read git config")?
            .open_level(ConfigLevel::Local)
            .context("Failed to open local git config")?;
        Ok(Self { config })
    }

    /// Trunk override set with `git config stk.trunk <branch>`
    pub fn trunk(&self) -> Result<Option<String>> {
        self.get(TRUNK_KEY)
    }

    /// Remote override set with `git config stk.remote <name>`
    pub fn remote(&self) -> Result<Option<String>> {
        self.get(REMOTE_KEY)
    }
}

impl ConfigStore for GitConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.config.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", key)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.config
            .set_str(key, value)
            .with_context(|| format!("Failed to write {}", key))
    }

    fn unset(&mut self, key: &str) -> Result<()> {
        match self.config.remove(key) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", key)),
        }
    }

    fn entries(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        // libgit2 matches with POSIX regex; a plain prefix test avoids
        // escaping branch names for it.
        let mut found = Vec::new();
        self.config.entries(None)?.for_each(|entry| {
            if let (Some(name), Some(value)) = (entry.name(), entry.value()) {
                if name.starts_with(prefix) {
                    found.push((name.to_string(), value.to_string()));
                }
            }
        })?;
        Ok(found)
    }
}
