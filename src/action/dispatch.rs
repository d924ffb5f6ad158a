use chrono::NaiveDate;
use tracing::{info, instrument};

use super::types::{ActionKind, ActionRequest};
use super::ActionError;
use crate::bitbucket::{Bitbucket, NewPullRequest, PullRequest};

const DEFAULT_BASE_BRANCH: &str = "develop";
const RELEASE_TARGET: &str = "master";
const SANDBOX_BRANCH: &str = "sandbox";

/// What a finished action reports back to the terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub summary: String,
    pub link: Option<String>,
}

impl Outcome {
    fn new(summary: impl Into<String>, pr: Option<&PullRequest>) -> Self {
        Self {
            summary: summary.into(),
            link: pr.and_then(|p| p.html_url()).map(str::to_string),
        }
    }
}

/// Runs one `ActionRequest` against the remote API.
///
/// Every action is one to three remote calls in a fixed order; nothing is
/// retried and nothing is rolled back when a later call fails.
pub struct Dispatcher<'a> {
    api: &'a dyn Bitbucket,
    reviewers: &'a [String],
    today: NaiveDate,
}

impl<'a> Dispatcher<'a> {
    pub fn new(api: &'a dyn Bitbucket, reviewers: &'a [String], today: NaiveDate) -> Self {
        Self {
            api,
            reviewers,
            today,
        }
    }

    #[instrument(skip(self), fields(repo = %request.repo_name, action = %request.action))]
    pub async fn dispatch(&self, request: &ActionRequest) -> Result<Outcome, ActionError> {
        let outcome = match request.action {
            ActionKind::ReleasePr => self.branch_off_to_master(request, "release", "Release").await,
            ActionKind::HotfixPr => self.branch_off_to_master(request, "hotfix", "Hotfix").await,
            ActionKind::MergeToSandbox | ActionKind::MergeSandbox => {
                self.merge_into_sandbox(request).await
            }
            ActionKind::DevelopPr => self.develop_pr(request).await,
            ActionKind::DeleteBranch => self.delete_branch(request).await,
            ActionKind::MergePr => self.merge_pr(request).await,
            ActionKind::DeclinePr => self.decline_pr(request).await,
            ActionKind::PrAddReview => self.add_reviewers(request).await,
        }?;
        info!(summary = %outcome.summary, link = ?outcome.link, "action finished");
        Ok(outcome)
    }

    fn stamp(&self) -> String {
        self.today.format("%Y%m%d").to_string()
    }

    /// release_pr / hotfix_pr: cut `<prefix>/<date>` from the source branch
    /// and open a pull request from it into master.
    async fn branch_off_to_master(
        &self,
        request: &ActionRequest,
        prefix: &str,
        title: &str,
    ) -> Result<Outcome, ActionError> {
        let repo = &request.repo_name;
        let branch = format!("{prefix}/{}", self.stamp());
        let parent = request.source_branch.as_deref().unwrap_or(DEFAULT_BASE_BRANCH);

        self.api.create_branch(repo, &branch, parent).await?;
        let pr = self
            .api
            .create_pull_request(
                repo,
                &NewPullRequest {
                    title: format!("{title}/{}", self.stamp()),
                    source_branch: Some(branch.clone()),
                    destination_branch: RELEASE_TARGET.to_string(),
                    close_source_branch: true,
                },
            )
            .await?;
        Ok(Outcome::new(
            format!("{title} pull request #{} created from {branch}", pr.id),
            Some(&pr),
        ))
    }

    async fn merge_into_sandbox(&self, request: &ActionRequest) -> Result<Outcome, ActionError> {
        let repo = &request.repo_name;
        let source = request.source_branch.as_deref().unwrap_or(DEFAULT_BASE_BRANCH);
        let pr = self
            .api
            .create_pull_request(
                repo,
                &NewPullRequest {
                    title: format!("sandbox-{}", self.stamp()),
                    source_branch: Some(source.to_string()),
                    destination_branch: SANDBOX_BRANCH.to_string(),
                    close_source_branch: false,
                },
            )
            .await?;
        self.api.merge_pull_request(repo, pr.id).await?;
        Ok(Outcome::new(
            format!("{source} merged into {SANDBOX_BRANCH} via #{}", pr.id),
            Some(&pr),
        ))
    }

    /// Without a source branch the request still goes out under a dated
    /// title, and the service's answer is reported as is.
    async fn develop_pr(&self, request: &ActionRequest) -> Result<Outcome, ActionError> {
        let repo = &request.repo_name;
        let title = match request.source_branch.as_deref() {
            Some(source) => source.to_string(),
            None => format!("{DEFAULT_BASE_BRANCH}-{}", self.stamp()),
        };
        let pr = self
            .api
            .create_pull_request(
                repo,
                &NewPullRequest {
                    title,
                    source_branch: request.source_branch.clone(),
                    destination_branch: DEFAULT_BASE_BRANCH.to_string(),
                    close_source_branch: request.close_source_branch.unwrap_or(false),
                },
            )
            .await?;
        if request.merge.unwrap_or(false) {
            self.api.merge_pull_request(repo, pr.id).await?;
            return Ok(Outcome::new(
                format!(
                    "{} merged into {DEFAULT_BASE_BRANCH} via #{}",
                    pr.source_branch(),
                    pr.id
                ),
                Some(&pr),
            ));
        }
        Ok(Outcome::new(
            format!("Develop pull request #{} created", pr.id),
            Some(&pr),
        ))
    }

    /// Protected branches are only kept off the menu; a direct invocation is
    /// passed through and left to the service's branch restrictions.
    async fn delete_branch(&self, request: &ActionRequest) -> Result<Outcome, ActionError> {
        let branch = required_branch(request)?;
        self.api.delete_branch(&request.repo_name, branch).await?;
        Ok(Outcome::new(format!("Branch {branch} deleted"), None))
    }

    async fn merge_pr(&self, request: &ActionRequest) -> Result<Outcome, ActionError> {
        let pr = self.open_pull_request(request).await?;
        self.api.merge_pull_request(&request.repo_name, pr.id).await?;
        Ok(Outcome::new(format!("Pull request #{} merged", pr.id), Some(&pr)))
    }

    async fn decline_pr(&self, request: &ActionRequest) -> Result<Outcome, ActionError> {
        let pr = self.open_pull_request(request).await?;
        self.api.decline_pull_request(&request.repo_name, pr.id).await?;
        Ok(Outcome::new(format!("Pull request #{} declined", pr.id), Some(&pr)))
    }

    async fn add_reviewers(&self, request: &ActionRequest) -> Result<Outcome, ActionError> {
        if self.reviewers.is_empty() {
            return Err(ActionError::MissingConfiguration("VAR_REVIEWERS"));
        }
        let pr = self.open_pull_request(request).await?;
        self.api
            .set_reviewers(&request.repo_name, &pr, self.reviewers)
            .await?;
        Ok(Outcome::new(
            format!("{} reviewers set on #{}", self.reviewers.len(), pr.id),
            Some(&pr),
        ))
    }

    async fn open_pull_request(&self, request: &ActionRequest) -> Result<PullRequest, ActionError> {
        let id = request.pr_id.ok_or(ActionError::MissingParameter {
            action: request.action,
            parameter: "pr_id",
        })?;
        Ok(self.api.find_open_pull_request(&request.repo_name, id).await?)
    }
}

fn required_branch(request: &ActionRequest) -> Result<&str, ActionError> {
    request
        .source_branch
        .as_deref()
        .ok_or(ActionError::MissingParameter {
            action: request.action,
            parameter: "source_branch",
        })
}
