use anyhow::Result;
use serde::Serialize;

/// Lifecycle of a pull request as far as stacking cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Open,
    Merged,
    Closed,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub id: u64,
    pub status: RequestStatus,
    pub base: Option<String>,
    pub url: Option<String>,
}

/// Code-review host operations used by the stack engine.
pub trait ReviewService {
    /// Open request whose head is `branch`, if any.
    fn find_open_request(&self, branch: &str) -> Result<Option<ReviewRequest>>;

    fn request_status(&self, id: u64) -> Result<RequestStatus>;

    fn create_request(&self, head: &str, base: &str, title: &str, draft: bool)
        -> Result<ReviewRequest>;

    fn update_request_base(&self, id: u64, base: &str) -> Result<()>;

    fn close_request(&self, id: u64) -> Result<()>;

    fn request_url(&self, id: u64) -> String;
}
