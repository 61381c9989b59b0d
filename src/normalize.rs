//! Pure mapping from provider webhook payloads to [`Notification`].

use serde_json::Value;

use crate::error::NormalizationError;
use crate::notification::{CommitSummary, Notification, NotificationSource};

/// Normalizes a provider-specific push payload.
///
/// No I/O and no state; the same payload always yields the same
/// notification.
pub fn normalize(
    source: NotificationSource,
    payload: &Value,
) -> Result<Notification, NormalizationError> {
    match source {
        NotificationSource::GitHubPush => normalize_github(payload),
        NotificationSource::GitLabPush => normalize_gitlab(payload),
    }
}

/// The branch is the final path segment of the ref
/// (`refs/heads/main` -> `main`).
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.rsplit('/').next().unwrap_or(git_ref)
}

fn normalize_github(payload: &Value) -> Result<Notification, NormalizationError> {
    let git_ref = required_str(payload, "ref")?;
    let repository_name = payload
        .get("repository")
        .and_then(|r| r.get("full_name"))
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("repository.full_name"))?;
    let actor = payload
        .get("pusher")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("pusher.name"))?;
    let compare_url = required_str(payload, "compare")?;
    let commits = normalize_commits(payload)?;

    Ok(Notification {
        source: NotificationSource::GitHubPush,
        repository_name: repository_name.to_string(),
        branch: branch_from_ref(git_ref).to_string(),
        actor: actor.to_string(),
        commits,
        compare_url: Some(compare_url.to_string()),
    })
}

fn normalize_gitlab(payload: &Value) -> Result<Notification, NormalizationError> {
    let git_ref = required_str(payload, "ref")?;
    let repository_name = payload
        .get("project")
        .and_then(|p| p.get("path_with_namespace"))
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("project.path_with_namespace"))?;
    let actor = required_str(payload, "user_name")?;
    let commits = normalize_commits(payload)?;

    // GitLab pushes carry no compare URL in this model.
    Ok(Notification {
        source: NotificationSource::GitLabPush,
        repository_name: repository_name.to_string(),
        branch: branch_from_ref(git_ref).to_string(),
        actor: actor.to_string(),
        commits,
        compare_url: None,
    })
}

/// Maps the `commits` array, preserving provider order. An empty array
/// is a valid zero-commit push (branch deletion, tag push).
fn normalize_commits(payload: &Value) -> Result<Vec<CommitSummary>, NormalizationError> {
    let commits = payload
        .get("commits")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("commits"))?;

    commits
        .iter()
        .map(|commit| {
            let id = commit
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("commits[].id"))?;
            let message = commit
                .get("message")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("commits[].message"))?;
            let author = commit
                .get("author")
                .and_then(|a| a.get("name"))
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("commits[].author.name"))?;
            Ok(CommitSummary::new(id, message, author))
        })
        .collect()
}

fn required_str<'a>(payload: &'a Value, field: &str) -> Result<&'a str, NormalizationError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(field))
}

fn malformed(field: &str) -> NormalizationError {
    NormalizationError::MalformedPayload(field.to_string())
}
