use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every remote mutation a menu line can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ReleasePr,
    HotfixPr,
    /// Offered on the repository level ("new" submenu).
    MergeToSandbox,
    /// Offered on branches and pull requests.
    MergeSandbox,
    DevelopPr,
    DeleteBranch,
    MergePr,
    DeclinePr,
    PrAddReview,
}

impl ActionKind {
    pub const ALL: [ActionKind; 9] = [
        ActionKind::ReleasePr,
        ActionKind::HotfixPr,
        ActionKind::MergeToSandbox,
        ActionKind::MergeSandbox,
        ActionKind::DevelopPr,
        ActionKind::DeleteBranch,
        ActionKind::MergePr,
        ActionKind::DeclinePr,
        ActionKind::PrAddReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ReleasePr => "release_pr",
            ActionKind::HotfixPr => "hotfix_pr",
            ActionKind::MergeToSandbox => "merge_to_sandbox",
            ActionKind::MergeSandbox => "merge_sandbox",
            ActionKind::DevelopPr => "develop_pr",
            ActionKind::DeleteBranch => "delete_branch",
            ActionKind::MergePr => "merge_pr",
            ActionKind::DeclinePr => "decline_pr",
            ActionKind::PrAddReview => "pr_add_review",
        }
    }

    /// Resolve the short names accepted by the positional command line.
    pub fn from_alias(name: &str) -> Option<ActionKind> {
        match name {
            "release" => Some(ActionKind::ReleasePr),
            "hotfix" => Some(ActionKind::HotfixPr),
            "sandbox" => Some(ActionKind::MergeSandbox),
            "develop" => Some(ActionKind::DevelopPr),
            "delete" => Some(ActionKind::DeleteBranch),
            other => other.parse().ok(),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by `ActionKind::from_str` for names outside the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownActionName(pub String);

impl FromStr for ActionKind {
    type Err = UnknownActionName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownActionName(s.to_string()))
    }
}

/// Parameters of one action invocation, carried inside a menu line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub repo_name: String,
    pub action: ActionKind,
    pub source_branch: Option<String>,
    pub pr_id: Option<u64>,
    /// Merge the pull request right after opening it.
    pub merge: Option<bool>,
    pub close_source_branch: Option<bool>,
}

impl ActionRequest {
    pub fn new(repo_name: impl Into<String>, action: ActionKind) -> Self {
        Self {
            repo_name: repo_name.into(),
            action,
            source_branch: None,
            pr_id: None,
            merge: None,
            close_source_branch: None,
        }
    }

    pub fn with_source_branch(mut self, branch: impl Into<String>) -> Self {
        self.source_branch = Some(branch.into());
        self
    }

    pub fn with_pr_id(mut self, id: u64) -> Self {
        self.pr_id = Some(id);
        self
    }

    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = Some(merge);
        self
    }

    pub fn with_close_source_branch(mut self, close: bool) -> Self {
        self.close_source_branch = Some(close);
        self
    }

    /// Same request with another action.
    pub fn for_action(&self, action: ActionKind) -> Self {
        Self {
            action,
            ..self.clone()
        }
    }
}
