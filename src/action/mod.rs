pub mod dispatch;
pub mod token;
pub mod types;

pub use dispatch::Dispatcher;
pub use types::{ActionKind, ActionRequest};

use thiserror::Error;

use crate::bitbucket::ApiError;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Malformed action token: {0}")]
    MalformedToken(String),

    #[error("Unknown action {0:?}")]
    UnknownAction(String),

    #[error("Action {action} needs a {parameter}")]
    MissingParameter {
        action: ActionKind,
        parameter: &'static str,
    },

    #[error("Missing configuration value {0}")]
    MissingConfiguration(&'static str),

    #[error(transparent)]
    Remote(#[from] ApiError),

    #[error("Expected a token or <repo> <action> [source-branch], got {0} arguments")]
    Usage(usize),
}

/// Build a request from the command line: either a single token, or the
/// older positional `<repo> <action> [source-branch]` form.
pub fn parse_invocation(args: &[String]) -> Result<ActionRequest, ActionError> {
    match args {
        [token] => token::decode(token),
        [repo, action] => positional(repo, action, None),
        [repo, action, branch] => positional(repo, action, Some(branch)),
        other => Err(ActionError::Usage(other.len())),
    }
}

fn positional(repo: &str, action: &str, branch: Option<&String>) -> Result<ActionRequest, ActionError> {
    let kind = ActionKind::from_alias(action)
        .ok_or_else(|| ActionError::UnknownAction(action.to_string()))?;
    let request = ActionRequest::new(repo, kind);
    Ok(match branch {
        Some(branch) => request.with_source_branch(branch.as_str()),
        None => request,
    })
}
