pub mod client;
#[cfg(test)]
pub mod fake;
pub mod types;

pub use client::HttpBitbucket;
pub use types::{Branch, BranchListing, NewPullRequest, Pipeline, PullRequest, Repository, Step};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other 4xx. The message is the service's response body, verbatim.
    #[error("Bitbucket rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Bitbucket unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected response shape: {0}")]
    Schema(String),
}

impl ApiError {
    /// Map a non-success HTTP status and its body onto the error taxonomy.
    pub fn from_status(status: StatusCode, body: String) -> ApiError {
        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(body),
            StatusCode::CONFLICT => ApiError::Conflict(body),
            s if s.is_client_error() => ApiError::Rejected {
                status: s.as_u16(),
                message: body,
            },
            s => ApiError::Unavailable(format!("HTTP {}: {}", s.as_u16(), body)),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Schema(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::from_status(status, err.to_string())
        } else {
            ApiError::Unavailable(err.to_string())
        }
    }
}

/// The slice of the Bitbucket Cloud REST API the plugin uses.
///
/// Listings that take a `since` cutoff stop paginating at the first item
/// older than it; callers still filter, since the service's own ordering
/// and query filters are the only guarantee.
#[async_trait]
pub trait Bitbucket: Send + Sync {
    /// Repositories in the workspace, most recently updated first.
    async fn recent_repositories(&self, since: DateTime<Utc>)
        -> Result<Vec<Repository>, ApiError>;

    /// Pipelines of a repository, newest first.
    async fn recent_pipelines(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Pipeline>, ApiError>;

    async fn pipeline_steps(&self, repo: &str, pipeline_uuid: &str) -> Result<Vec<Step>, ApiError>;

    /// Raw log of a step, `None` when the step has not produced one.
    async fn step_log(
        &self,
        repo: &str,
        pipeline_uuid: &str,
        step_uuid: &str,
    ) -> Result<Option<String>, ApiError>;

    async fn branches(&self, repo: &str) -> Result<BranchListing, ApiError>;

    async fn open_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>, ApiError>;

    /// Look up an open pull request by id.
    async fn find_open_pull_request(&self, repo: &str, id: u64) -> Result<PullRequest, ApiError>;

    async fn create_branch(&self, repo: &str, name: &str, parent: &str) -> Result<(), ApiError>;

    async fn delete_branch(&self, repo: &str, name: &str) -> Result<(), ApiError>;

    async fn create_pull_request(
        &self,
        repo: &str,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, ApiError>;

    async fn merge_pull_request(&self, repo: &str, id: u64) -> Result<(), ApiError>;

    async fn decline_pull_request(&self, repo: &str, id: u64) -> Result<(), ApiError>;

    /// Replace the reviewer set of a pull request with the given account UUIDs.
    async fn set_reviewers(
        &self,
        repo: &str,
        pr: &PullRequest,
        reviewer_uuids: &[String],
    ) -> Result<(), ApiError>;
}
