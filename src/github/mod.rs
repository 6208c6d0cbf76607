mod client;
mod pr;

pub use client::GitHubClient;
pub use pr::PullRequest;

use crate::config::Config;
use crate::error::StackError;
use crate::git::GitRepo;
use crate::remote::RemoteInfo;
use crate::review::{RequestStatus, ReviewRequest, ReviewService};
use anyhow::{Context, Result};
use tokio::runtime::Runtime;

/// Blocking [`ReviewService`] over the async GitHub client.
pub struct GitHubService {
    rt: Runtime,
    client: GitHubClient,
    remote: RemoteInfo,
}

impl GitHubService {
    pub fn new(remote: RemoteInfo, token: &str) -> Result<Self> {
        let client = GitHubClient::new(
            remote.owner(),
            &remote.repo,
            remote.api_base_url.clone(),
            token,
        )?;
        let rt = Runtime::new().context("Failed to start async runtime")?;
        Ok(Self { rt, client, remote })
    }

    /// Connect using the repository's remote and the configured token.
    /// `Ok(None)` when no token is available.
    pub fn connect(repo: &GitRepo, config: &Config) -> Result<Option<Self>> {
        let Some(token) = config.github_token() else {
            tracing::info!("no GitHub token configured; review features disabled");
            return Ok(None);
        };
        let remote = RemoteInfo::from_repo(repo, config)?;
        Ok(Some(Self::new(remote, &token)?))
    }

    /// Like [`connect`](Self::connect) but a missing token is an error.
    pub fn require(repo: &GitRepo, config: &Config) -> Result<Self> {
        Self::connect(repo, config)?.ok_or_else(|| {
            StackError::precondition(
                "GitHub token not set",
                "export GITHUB_TOKEN or add [github] token to the stk config file",
            )
            .into()
        })
    }

    pub fn remote(&self) -> &RemoteInfo {
        &self.remote
    }
}

fn remote_err(err: anyhow::Error) -> anyhow::Error {
    StackError::RemoteService(format!("{:#}", err)).into()
}

impl ReviewService for GitHubService {
    fn find_open_request(&self, branch: &str) -> Result<Option<ReviewRequest>> {
        let pr = self
            .rt
            .block_on(self.client.find_open_pr(branch))
            .map_err(remote_err)?;
        Ok(pr.map(PullRequest::into_request))
    }

    fn request_status(&self, id: u64) -> Result<RequestStatus> {
        let pr = self.rt.block_on(self.client.get_pr(id)).map_err(remote_err)?;
        Ok(pr.map_or(RequestStatus::NotFound, |pr| pr.status()))
    }

    fn create_request(
        &self,
        head: &str,
        base: &str,
        title: &str,
        draft: bool,
    ) -> Result<ReviewRequest> {
        let pr = self
            .rt
            .block_on(self.client.create_pr(head, base, title, draft))
            .map_err(remote_err)?;
        Ok(pr.into_request())
    }

    fn update_request_base(&self, id: u64, base: &str) -> Result<()> {
        self.rt
            .block_on(self.client.update_pr_base(id, base))
            .map_err(remote_err)
    }

    fn close_request(&self, id: u64) -> Result<()> {
        self.rt.block_on(self.client.close_pr(id)).map_err(remote_err)
    }

    fn request_url(&self, id: u64) -> String {
        self.remote.pr_url(id)
    }
}
