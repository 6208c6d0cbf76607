use anyhow::{Context, Result};
use octocrab::Octocrab;

pub struct GitHubClient {
    pub octocrab: Octocrab,
    pub owner: String,
    pub repo: String,
}

impl GitHubClient {
    /// Create a new GitHub client authenticated with `token`
    pub fn new(owner: &str, repo: &str, api_base_url: Option<String>, token: &str) -> Result<Self> {
        // octocrab builds its TLS stack on rustls, which needs a process-wide
        // provider. A second install returns Err and is harmless.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(api_base) = api_base_url {
            builder = builder
                .base_uri(api_base)
                .context("Failed to set GitHub API base URL")?;
        }

        let octocrab = builder.build().context("Failed to create GitHub client")?;

        Ok(Self {
            octocrab,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Create a new GitHub client with a custom Octocrab instance (for testing)
    #[cfg(test)]
    pub fn with_octocrab(octocrab: Octocrab, owner: &str, repo: &str) -> Self {
        Self {
            octocrab,
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    pub(crate) fn pulls_route(&self) -> String {
        format!("/repos/{}/{}/pulls", self.owner, self.repo)
    }
}

/// True when octocrab reports an HTTP 404.
pub(crate) fn is_not_found(err: &octocrab::Error) -> bool {
    matches!(err, octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404)
}
