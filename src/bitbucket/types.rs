use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One page of a paginated listing.
///
/// Most endpoints link the next page through `next`; the pipelines endpoints
/// only report `page`/`pagelen`/`size`, so both conventions are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    pub next: Option<String>,
    pub page: Option<u32>,
    pub pagelen: Option<u32>,
    pub size: Option<u64>,
}

impl<T> Page<T> {
    /// Page number to request next when no `next` link is given.
    pub fn following_page(&self) -> Option<u32> {
        if self.next.is_some() || self.values.is_empty() {
            return None;
        }
        let (page, pagelen, size) = (self.page?, self.pagelen?, self.size?);
        (u64::from(page) * u64::from(pagelen) < size).then_some(page + 1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    /// URL-safe identifier; paths are built from it when present.
    pub slug: Option<String>,
    pub updated_on: DateTime<Utc>,
}

impl Repository {
    pub fn path_name(&self) -> &str {
        self.slug.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Account {
    pub nickname: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub uuid: String,
    pub build_number: u64,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub build_seconds_used: Option<u64>,
    #[serde(default)]
    pub state: Option<StepState>,
    #[serde(default)]
    pub target: Option<PipelineTarget>,
}

/// What a pipeline was run against.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineTarget {
    #[serde(rename = "pipeline_ref_target")]
    Ref { ref_name: Option<String> },
    #[serde(rename = "pipeline_pullrequest_target")]
    PullRequest { source: Option<String> },
    #[serde(other)]
    Other,
}

impl PipelineTarget {
    pub fn label(&self) -> &str {
        match self {
            PipelineTarget::Ref { ref_name: Some(name) } => name,
            PipelineTarget::PullRequest { source: Some(source) } => source,
            _ => "-",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub uuid: String,
    pub name: Option<String>,
    pub state: StepState,
    #[serde(default)]
    pub duration_in_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StepState {
    /// PENDING, IN_PROGRESS, COMPLETED, or anything else the service invents.
    pub name: String,
}

impl Step {
    pub fn state_name(&self) -> &str {
        &self.state.name
    }

    pub fn is_in_progress(&self) -> bool {
        self.state.name == "IN_PROGRESS"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub target: Option<Commit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitAuthor {
    /// Linked account, absent when the commit email maps to no user.
    pub user: Option<Account>,
}

impl Branch {
    pub fn author(&self) -> Option<&Account> {
        self.target.as_ref()?.author.as_ref()?.user.as_ref()
    }

    pub fn message(&self) -> &str {
        self.target
            .as_ref()
            .and_then(|t| t.message.as_deref())
            .unwrap_or("")
    }
}

/// First page of a branch listing plus the total branch count.
#[derive(Debug, Clone)]
pub struct BranchListing {
    pub branches: Vec<Branch>,
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub author: Option<Account>,
    pub source: Endpoint,
    pub destination: Endpoint,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    #[serde(default)]
    pub reviewers: Vec<Account>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub links: Option<Links>,
}

impl PullRequest {
    pub fn source_branch(&self) -> &str {
        &self.source.branch.name
    }

    pub fn destination_branch(&self) -> &str {
        &self.destination.branch.name
    }

    pub fn is_open(&self) -> bool {
        self.state.as_deref().is_none_or(|s| s == "OPEN")
    }

    pub fn html_url(&self) -> Option<&str> {
        self.links.as_ref()?.html.as_ref().map(|l| l.href.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub branch: BranchRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Links {
    pub html: Option<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Body of a pull-request creation call.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPullRequest {
    pub title: String,
    /// Sent as `null` when absent; the service then rejects the request.
    pub source_branch: Option<String>,
    pub destination_branch: String,
    pub close_source_branch: bool,
}

impl NewPullRequest {
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "source": { "branch": { "name": self.source_branch } },
            "destination": { "branch": { "name": self.destination_branch } },
            "close_source_branch": self.close_source_branch,
        })
    }
}
