//! GitHub webhook payload parser.
//!
//! Parses raw webhook JSON into typed [`RepoEvent`] values, keyed by the
//! `X-GitHub-Event` header.
//!
//! # Parsing strategy
//!
//! 1. The event kind is determined from the event header
//! 2. The payload is parsed according to the kind
//! 3. Unknown kinds return `Ok(None)` (ignored, not an error)
//! 4. Issue/PR actions outside {opened, closed, reopened, edited} return
//!    `Ok(None)` (noise filter, not an error)
//! 5. Malformed payloads return `Err` with details

use serde::Deserialize;
use thiserror::Error;

use crate::types::RepoId;

use super::events::{
    CommitRef, InstallationAction, InstallationEvent, InstallationRepositoriesEvent, IssueAction,
    IssueEvent, PullRequestEvent, PushEvent, RepoEvent,
};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses a webhook payload into a typed event.
///
/// * `Ok(Some(event))` - a recognized kind with a forwarded action
/// * `Ok(None)` - unknown kind, or a filtered issue/PR/installation action
/// * `Err(e)` - malformed payload for a recognized kind
pub fn parse_webhook(event_kind: &str, payload: &[u8]) -> Result<Option<RepoEvent>, ParseError> {
    match event_kind {
        "push" => parse_push(payload).map(|e| Some(RepoEvent::Push(e))),
        "issues" => parse_issues(payload).map(|opt| opt.map(RepoEvent::Issue)),
        "pull_request" => parse_pull_request(payload).map(|opt| opt.map(RepoEvent::PullRequest)),
        "installation" => parse_installation(payload).map(|opt| opt.map(RepoEvent::Installation)),
        "installation_repositories" => parse_installation_repositories(payload)
            .map(|e| Some(RepoEvent::InstallationRepositories(e))),
        // Unknown event kinds are ignored (not an error)
        _ => Ok(None),
    }
}

fn forwarded_action(action: &str) -> Option<IssueAction> {
    match action {
        "opened" => Some(IssueAction::Opened),
        "closed" => Some(IssueAction::Closed),
        "reopened" => Some(IssueAction::Reopened),
        "edited" => Some(IssueAction::Edited),
        _ => None,
    }
}

// ============================================================================
// Raw payload structures for deserialization
//
// These match GitHub's webhook JSON. Option<T> is used liberally so a missing
// optional field degrades gracefully; required fields are validated by serde.
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawOwner,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawSender {
    login: String,
}

impl RawRepository {
    fn into_repo_id(self) -> RepoId {
        RepoId::new(self.owner.login, self.name)
    }
}

// ============================================================================
// push event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPushPayload {
    #[serde(rename = "ref")]
    ref_name: String,
    #[serde(default)]
    commits: Vec<RawCommit>,
    head_commit: Option<RawCommit>,
    repository: RawRepository,
    sender: Option<RawSender>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    id: String,
    message: String,
    url: String,
}

impl RawCommit {
    fn into_commit_ref(self) -> CommitRef {
        CommitRef {
            id: self.id,
            message: self.message,
            url: self.url,
        }
    }
}

fn parse_push(payload: &[u8]) -> Result<PushEvent, ParseError> {
    let raw: RawPushPayload = serde_json::from_slice(payload)?;

    let branch = raw
        .ref_name
        .strip_prefix("refs/heads/")
        .unwrap_or(&raw.ref_name)
        .to_string();

    Ok(PushEvent {
        repo: raw.repository.into_repo_id(),
        branch,
        commits: raw
            .commits
            .into_iter()
            .map(RawCommit::into_commit_ref)
            .collect(),
        head_commit: raw.head_commit.map(RawCommit::into_commit_ref),
        sender: raw.sender.map(|s| s.login).unwrap_or_default(),
    })
}

// ============================================================================
// issues event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawIssuesPayload {
    action: String,
    issue: RawIssue,
    repository: RawRepository,
    sender: Option<RawSender>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    html_url: String,
    state: String,
}

fn parse_issues(payload: &[u8]) -> Result<Option<IssueEvent>, ParseError> {
    let raw: RawIssuesPayload = serde_json::from_slice(payload)?;

    // Filtered actions (labeled, assigned, ...) are dropped, not errors
    let action = match forwarded_action(&raw.action) {
        Some(a) => a,
        None => return Ok(None),
    };

    Ok(Some(IssueEvent {
        repo: raw.repository.into_repo_id(),
        action,
        number: raw.issue.number,
        title: raw.issue.title,
        html_url: raw.issue.html_url,
        state: raw.issue.state,
        sender: raw.sender.map(|s| s.login).unwrap_or_default(),
    }))
}

// ============================================================================
// pull_request event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequest,
    repository: RawRepository,
    sender: Option<RawSender>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    title: String,
    html_url: String,
    state: String,
    merged: Option<bool>,
}

fn parse_pull_request(payload: &[u8]) -> Result<Option<PullRequestEvent>, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;

    let action = match forwarded_action(&raw.action) {
        Some(a) => a,
        None => return Ok(None),
    };

    Ok(Some(PullRequestEvent {
        repo: raw.repository.into_repo_id(),
        action,
        number: raw.pull_request.number,
        title: raw.pull_request.title,
        html_url: raw.pull_request.html_url,
        state: raw.pull_request.state,
        merged: raw.pull_request.merged.unwrap_or(false),
        sender: raw.sender.map(|s| s.login).unwrap_or_default(),
    }))
}

// ============================================================================
// installation / installation_repositories events
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawInstallationPayload {
    action: String,
    installation: RawInstallation,
}

#[derive(Debug, Deserialize)]
struct RawInstallation {
    id: i64,
    account: RawAccount,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    login: String,
    id: i64,
}

fn parse_installation(payload: &[u8]) -> Result<Option<InstallationEvent>, ParseError> {
    let raw: RawInstallationPayload = serde_json::from_slice(payload)?;

    // Only created/deleted affect the installation mirror; suspend and
    // friends are ignored
    let action = match raw.action.as_str() {
        "created" => InstallationAction::Created,
        "deleted" => InstallationAction::Deleted,
        _ => return Ok(None),
    };

    Ok(Some(InstallationEvent {
        action,
        installation_id: raw.installation.id,
        account_login: raw.installation.account.login,
        account_id: raw.installation.account.id,
    }))
}

fn parse_installation_repositories(
    payload: &[u8],
) -> Result<InstallationRepositoriesEvent, ParseError> {
    let raw: RawInstallationPayload = serde_json::from_slice(payload)?;

    Ok(InstallationRepositoriesEvent {
        action: raw.action,
        account_login: raw.installation.account.login,
    })
}
