//! In-memory `Bitbucket` that serves canned data and records every call.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use super::types::{
    Account, BranchListing, BranchRef, Endpoint, NewPullRequest, Pipeline, PipelineTarget,
    PullRequest, Repository, Step, StepState,
};
use super::{ApiError, Bitbucket};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBranch { repo: String, name: String, parent: String },
    DeleteBranch { repo: String, name: String },
    CreatePullRequest { repo: String, pr: NewPullRequest },
    MergePullRequest { repo: String, id: u64 },
    DeclinePullRequest { repo: String, id: u64 },
    SetReviewers { repo: String, id: u64, reviewers: Vec<String> },
    Lookup { repo: String, id: u64 },
}

#[derive(Default)]
pub struct FakeBitbucket {
    pub repositories: Vec<Repository>,
    pub pipelines: HashMap<String, Vec<Pipeline>>,
    pub steps: HashMap<String, Vec<Step>>,
    pub logs: HashMap<String, String>,
    pub branches: HashMap<String, BranchListing>,
    pub pull_requests: HashMap<String, Vec<PullRequest>>,
    /// Repositories whose reads fail with `Unavailable`.
    pub broken: Vec<String>,
    /// Branch names whose creation is rejected as already existing.
    pub existing_branches: Vec<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBitbucket {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check(&self, repo: &str) -> Result<(), ApiError> {
        if self.broken.iter().any(|r| r == repo) {
            return Err(ApiError::Unavailable(format!("{repo} is down")));
        }
        Ok(())
    }
}

#[async_trait]
impl Bitbucket for FakeBitbucket {
    async fn recent_repositories(
        &self,
        _since: DateTime<Utc>,
    ) -> Result<Vec<Repository>, ApiError> {
        Ok(self.repositories.clone())
    }

    async fn recent_pipelines(
        &self,
        repo: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<Pipeline>, ApiError> {
        self.check(repo)?;
        Ok(self.pipelines.get(repo).cloned().unwrap_or_default())
    }

    async fn pipeline_steps(&self, repo: &str, pipeline_uuid: &str) -> Result<Vec<Step>, ApiError> {
        self.check(repo)?;
        Ok(self.steps.get(pipeline_uuid).cloned().unwrap_or_default())
    }

    async fn step_log(
        &self,
        _repo: &str,
        _pipeline_uuid: &str,
        step_uuid: &str,
    ) -> Result<Option<String>, ApiError> {
        Ok(self.logs.get(step_uuid).cloned())
    }

    async fn branches(&self, repo: &str) -> Result<BranchListing, ApiError> {
        self.check(repo)?;
        Ok(self.branches.get(repo).cloned().unwrap_or(BranchListing {
            branches: vec![],
            total: 0,
        }))
    }

    async fn open_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>, ApiError> {
        self.check(repo)?;
        Ok(self.pull_requests.get(repo).cloned().unwrap_or_default())
    }

    async fn find_open_pull_request(&self, repo: &str, id: u64) -> Result<PullRequest, ApiError> {
        self.record(Call::Lookup { repo: repo.to_string(), id });
        self.pull_requests
            .get(repo)
            .and_then(|prs| prs.iter().find(|pr| pr.id == id))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("open pull request #{id} in {repo}")))
    }

    async fn create_branch(&self, repo: &str, name: &str, parent: &str) -> Result<(), ApiError> {
        self.record(Call::CreateBranch {
            repo: repo.to_string(),
            name: name.to_string(),
            parent: parent.to_string(),
        });
        if self.existing_branches.iter().any(|b| b == name) {
            return Err(ApiError::Rejected {
                status: 400,
                message: format!("BRANCH_ALREADY_EXISTS: {name}"),
            });
        }
        Ok(())
    }

    async fn delete_branch(&self, repo: &str, name: &str) -> Result<(), ApiError> {
        self.record(Call::DeleteBranch {
            repo: repo.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, ApiError> {
        self.record(Call::CreatePullRequest {
            repo: repo.to_string(),
            pr: pr.clone(),
        });
        let Some(source) = pr.source_branch.as_deref() else {
            return Err(ApiError::Rejected {
                status: 400,
                message: "source branch is required".to_string(),
            });
        };
        let mut created = pull_request(900, &pr.title, "me", source);
        created.destination = endpoint(&pr.destination_branch);
        Ok(created)
    }

    async fn merge_pull_request(&self, repo: &str, id: u64) -> Result<(), ApiError> {
        self.record(Call::MergePullRequest { repo: repo.to_string(), id });
        Ok(())
    }

    async fn decline_pull_request(&self, repo: &str, id: u64) -> Result<(), ApiError> {
        self.record(Call::DeclinePullRequest { repo: repo.to_string(), id });
        Ok(())
    }

    async fn set_reviewers(
        &self,
        repo: &str,
        pr: &PullRequest,
        reviewer_uuids: &[String],
    ) -> Result<(), ApiError> {
        self.record(Call::SetReviewers {
            repo: repo.to_string(),
            id: pr.id,
            reviewers: reviewer_uuids.to_vec(),
        });
        Ok(())
    }
}

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, h, m, 0).unwrap()
}

pub fn account(nickname: &str) -> Account {
    Account {
        nickname: Some(nickname.to_string()),
        display_name: None,
    }
}

pub fn endpoint(branch: &str) -> Endpoint {
    Endpoint {
        branch: BranchRef {
            name: branch.to_string(),
        },
    }
}

pub fn repository(name: &str, updated_on: DateTime<Utc>) -> Repository {
    Repository {
        name: name.to_string(),
        slug: None,
        updated_on,
    }
}

pub fn pipeline(build_number: u64, created_on: DateTime<Utc>, branch: &str) -> Pipeline {
    Pipeline {
        uuid: format!("{{p-{build_number}}}"),
        build_number,
        created_on,
        build_seconds_used: Some(60),
        state: None,
        target: Some(PipelineTarget::Ref {
            ref_name: Some(branch.to_string()),
        }),
    }
}

pub fn step(uuid: &str, name: &str, state: &str) -> Step {
    Step {
        uuid: uuid.to_string(),
        name: Some(name.to_string()),
        state: StepState {
            name: state.to_string(),
        },
        duration_in_seconds: Some(12),
    }
}

pub fn pull_request(id: u64, title: &str, author: &str, source: &str) -> PullRequest {
    PullRequest {
        id,
        title: title.to_string(),
        author: Some(account(author)),
        source: endpoint(source),
        destination: endpoint("develop"),
        created_on: at(1, 0),
        updated_on: at(2, 0),
        reviewers: vec![],
        state: Some("OPEN".to_string()),
        links: None,
    }
}
