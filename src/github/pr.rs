use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::client::is_not_found;
use super::GitHubClient;
use crate::review::{RequestStatus, ReviewRequest};

/// The subset of the pulls API payload we read.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub base: Option<PullRequestRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

impl PullRequest {
    pub fn status(&self) -> RequestStatus {
        if self.merged_at.is_some() {
            RequestStatus::Merged
        } else if self.state.eq_ignore_ascii_case("open") {
            RequestStatus::Open
        } else {
            RequestStatus::Closed
        }
    }

    pub fn into_request(self) -> ReviewRequest {
        ReviewRequest {
            id: self.number,
            status: self.status(),
            base: self.base.map(|b| b.ref_name),
            url: self.html_url,
        }
    }
}

#[derive(Serialize)]
struct ListParams<'a> {
    head: &'a str,
    state: &'a str,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    draft: bool,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
}

impl GitHubClient {
    /// Find the open PR whose head is `branch`
    pub async fn find_open_pr(&self, branch: &str) -> Result<Option<PullRequest>> {
        let head = format!("{}:{}", self.owner, branch);
        let prs: Vec<PullRequest> = self
            .octocrab
            .get(
                self.pulls_route(),
                Some(&ListParams {
                    head: &head,
                    state: "open",
                }),
            )
            .await
            .context("Failed to list PRs")?;
        Ok(prs.into_iter().next())
    }

    /// Get a PR by number; `None` when GitHub answers 404
    pub async fn get_pr(&self, number: u64) -> Result<Option<PullRequest>> {
        let route = format!("{}/{}", self.pulls_route(), number);
        match self.octocrab.get(route, None::<&()>).await {
            Ok(pr) => Ok(Some(pr)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to get PR #{}", number)),
        }
    }

    /// Create a new PR
    pub async fn create_pr(
        &self,
        head: &str,
        base: &str,
        title: &str,
        draft: bool,
    ) -> Result<PullRequest> {
        self.octocrab
            .post(
                self.pulls_route(),
                Some(&CreateBody {
                    title,
                    head,
                    base,
                    draft,
                }),
            )
            .await
            .with_context(|| format!("Failed to create PR for '{}'", head))
    }

    /// Update PR base branch
    pub async fn update_pr_base(&self, number: u64, new_base: &str) -> Result<()> {
        let route = format!("{}/{}", self.pulls_route(), number);
        let _: PullRequest = self
            .octocrab
            .patch(
                route,
                Some(&UpdateBody {
                    base: Some(new_base),
                    state: None,
                }),
            )
            .await
            .with_context(|| format!("Failed to retarget PR #{} onto '{}'", number, new_base))?;
        Ok(())
    }

    /// Close a PR without merging
    pub async fn close_pr(&self, number: u64) -> Result<()> {
        let route = format!("{}/{}", self.pulls_route(), number);
        let _: PullRequest = self
            .octocrab
            .patch(
                route,
                Some(&UpdateBody {
                    base: None,
                    state: Some("closed"),
                }),
            )
            .await
            .with_context(|| format!("Failed to close PR #{}", number))?;
        Ok(())
    }
}
