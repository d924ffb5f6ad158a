//! Action tokens: an `ActionRequest` as JSON, base64-encoded so that it fits
//! in a single menu attribute and a single command-line argument.
//!
//! The JSON keys (`repo_name`, `fun`, `source_branch`, `pr_id`, `merge`,
//! `close_source_branch`) are shared with tokens already embedded in
//! deployed menus, so they must not change.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::{ActionKind, ActionRequest, UnknownActionName};
use super::ActionError;

#[derive(Debug, Deserialize)]
struct WireRequest {
    repo_name: String,
    fun: String,
    #[serde(default)]
    source_branch: Option<String>,
    #[serde(default)]
    pr_id: Option<u64>,
    #[serde(default)]
    merge: Option<bool>,
    #[serde(default)]
    close_source_branch: Option<bool>,
}

pub fn encode(request: &ActionRequest) -> String {
    let mut fields = Map::new();
    fields.insert("repo_name".into(), Value::from(request.repo_name.as_str()));
    fields.insert("fun".into(), Value::from(request.action.as_str()));
    if let Some(branch) = &request.source_branch {
        fields.insert("source_branch".into(), Value::from(branch.as_str()));
    }
    if let Some(id) = request.pr_id {
        fields.insert("pr_id".into(), Value::from(id));
    }
    if let Some(merge) = request.merge {
        fields.insert("merge".into(), Value::from(merge));
    }
    if let Some(close) = request.close_source_branch {
        fields.insert("close_source_branch".into(), Value::from(close));
    }
    STANDARD.encode(Value::Object(fields).to_string())
}

/// Inverse of [`encode`]. Fails with `MalformedToken` on anything that is
/// not base64-wrapped JSON of the expected shape, and with `UnknownAction`
/// when the shape is right but the action is not one we dispatch.
pub fn decode(token: &str) -> Result<ActionRequest, ActionError> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|e| ActionError::MalformedToken(format!("not base64: {e}")))?;
    let wire: WireRequest = serde_json::from_slice(&bytes)
        .map_err(|e| ActionError::MalformedToken(format!("not an action record: {e}")))?;
    let action: ActionKind = wire
        .fun
        .parse()
        .map_err(|UnknownActionName(name)| ActionError::UnknownAction(name))?;

    Ok(ActionRequest {
        repo_name: wire.repo_name,
        action,
        source_branch: wire.source_branch,
        pr_id: wire.pr_id,
        merge: wire.merge,
        close_source_branch: wire.close_source_branch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_full_and_minimal() {
        let full = ActionRequest::new("shop", ActionKind::DevelopPr)
            .with_source_branch("feature/login \"quoted\" | piped")
            .with_pr_id(42)
            .with_merge(false)
            .with_close_source_branch(true);
        assert_eq!(decode(&encode(&full)).unwrap(), full);

        let minimal = ActionRequest::new("shop", ActionKind::ReleasePr);
        assert_eq!(decode(&encode(&minimal)).unwrap(), minimal);
    }

    #[test]
    fn test_token_is_argument_safe() {
        let request = ActionRequest::new("my repo", ActionKind::DeleteBranch)
            .with_source_branch("a b|c'd\"e");
        let token = encode(&request);
        assert!(!token.contains([' ', '|', '"', '\'', '\n']));
    }

    #[test]
    fn test_decodes_tokens_from_deployed_menus() {
        // {"repo_name": "shop", "source_branch": "feature/x", "fun": "merge_pr", "pr_id": 7}
        let token = STANDARD.encode(
            r#"{"repo_name": "shop", "source_branch": "feature/x", "fun": "merge_pr", "pr_id": 7}"#,
        );
        let request = decode(&token).unwrap();
        assert_eq!(request.action, ActionKind::MergePr);
        assert_eq!(request.pr_id, Some(7));
        assert_eq!(request.merge, None);
    }

    #[test]
    fn test_null_fields_decode_as_absent() {
        let token = STANDARD.encode(r#"{"repo_name":"shop","fun":"release_pr","source_branch":null}"#);
        assert_eq!(
            decode(&token).unwrap(),
            ActionRequest::new("shop", ActionKind::ReleasePr)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let tokens = vec![
            "%%%not-base64%%%".to_string(),
            String::new(),
            STANDARD.encode("not json"),
            STANDARD.encode(r#"{"fun":"merge_pr"}"#),
            STANDARD.encode(r#"{"repo_name":"shop","fun":"merge_pr","pr_id":"seven"}"#),
            STANDARD.encode(r#"{"repo_name":5,"fun":"merge_pr"}"#),
        ];
        for token in &tokens {
            assert!(
                matches!(decode(token), Err(ActionError::MalformedToken(_))),
                "{token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_unknown_action_in_token() {
        let token = STANDARD.encode(r#"{"repo_name":"shop","fun":"__import__"}"#);
        assert!(matches!(
            decode(&token),
            Err(ActionError::UnknownAction(name)) if name == "__import__"
        ));
    }
}
