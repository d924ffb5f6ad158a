//! Which repositories, pipelines, steps and branches make it into a menu.

use chrono::{DateTime, TimeDelta, Utc};

use crate::bitbucket::{Pipeline, PullRequest, Repository, Step};

pub const REPOSITORY_WINDOW_DAYS: i64 = 7;
pub const PIPELINE_WINDOW_MINUTES: i64 = 60;

/// Long-lived branches that never get a delete entry.
pub const PROTECTED_BRANCHES: [&str; 5] = ["master", "main", "develop", "dev", "sandbox"];

pub fn repository_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - TimeDelta::days(REPOSITORY_WINDOW_DAYS)
}

pub fn pipeline_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - TimeDelta::minutes(PIPELINE_WINDOW_MINUTES)
}

/// Strictly newer than the cutoff; a timestamp exactly on it is out.
pub fn within(at: DateTime<Utc>, cutoff: DateTime<Utc>) -> bool {
    at > cutoff
}

pub fn recent_repositories(repos: Vec<Repository>, now: DateTime<Utc>) -> Vec<Repository> {
    let cutoff = repository_cutoff(now);
    repos
        .into_iter()
        .filter(|r| within(r.updated_on, cutoff))
        .collect()
}

pub fn recent_pipelines(pipelines: Vec<Pipeline>, now: DateTime<Utc>) -> Vec<Pipeline> {
    let cutoff = pipeline_cutoff(now);
    pipelines
        .into_iter()
        .filter(|p| within(p.created_on, cutoff))
        .collect()
}

pub fn open_pull_requests(prs: Vec<PullRequest>) -> Vec<PullRequest> {
    prs.into_iter().filter(PullRequest::is_open).collect()
}

/// The step a pipeline is "at": the first one running, else the last one.
pub fn current_step(steps: &[Step]) -> Option<&Step> {
    steps
        .iter()
        .find(|s| s.is_in_progress())
        .or_else(|| steps.last())
}

pub fn is_protected(branch: &str) -> bool {
    PROTECTED_BRANCHES.contains(&branch)
}
