use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// User-level settings, read from `~/.config/stk/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub submit: SubmitConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct GitHubConfig {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteConfig {
    /// Git remote that hosts review branches
    #[serde(default = "default_remote_name")]
    pub name: String,
    /// Web base URL; derived from the remote URL when empty
    #[serde(default)]
    pub base_url: String,
    /// REST API base URL (GitHub Enterprise, tests)
    #[serde(default)]
    pub api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitConfig {
    /// Open new pull requests as drafts
    #[serde(default)]
    pub draft: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            name: default_remote_name(),
            base_url: String::new(),
            api_base_url: None,
        }
    }
}

fn default_remote_name() -> String {
    "origin".to_string()
}

impl Config {
    /// Get the config file path. `STK_CONFIG` overrides the default location.
    pub fn path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("STK_CONFIG") {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("stk");
        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or return default
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// GitHub token: `STK_GITHUB_TOKEN`, then `GITHUB_TOKEN`, then the config file
    pub fn github_token(&self) -> Option<String> {
        for var in ["STK_GITHUB_TOKEN", "GITHUB_TOKEN"] {
            if let Ok(token) = std::env::var(var) {
                if !token.trim().is_empty() {
                    return Some(token);
                }
            }
        }
        self.github.token.clone().filter(|t| !t.trim().is_empty())
    }

    pub fn remote_name(&self) -> &str {
        &self.remote.name
    }

    pub fn remote_base_url(&self) -> &str {
        &self.remote.base_url
    }
}
