//! Typed representations of the GitHub webhook events the bot handles.
//!
//! Each variant carries only the fields needed for routing and rendering.
//! Unknown event kinds and filtered actions never reach these types; the
//! parser drops them by returning `None`.

use serde::{Deserialize, Serialize};

use crate::types::{EventKind, RepoId};

/// A parsed GitHub webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepoEvent {
    /// Commits were pushed to a branch.
    Push(PushEvent),

    /// An issue was opened, closed, reopened, or edited.
    ///
    /// Other issue actions (labeled, assigned, ...) are dropped by the parser
    /// as a deliberate noise filter.
    Issue(IssueEvent),

    /// A pull request was opened, closed, reopened, or edited.
    ///
    /// Same action filter as issues.
    PullRequest(PullRequestEvent),

    /// The GitHub App was installed or uninstalled for an account.
    Installation(InstallationEvent),

    /// Repositories were added to or removed from an installation.
    ///
    /// Accepted and logged only; the installation record is account-scoped.
    InstallationRepositories(InstallationRepositoriesEvent),
}

impl RepoEvent {
    /// The subscription event kind this event maps to, if it is a
    /// notification-bearing event.
    pub fn event_kind(&self) -> Option<EventKind> {
        match self {
            RepoEvent::Push(_) => Some(EventKind::Commit),
            RepoEvent::Issue(_) => Some(EventKind::Issue),
            RepoEvent::PullRequest(_) => Some(EventKind::Pr),
            RepoEvent::Installation(_) | RepoEvent::InstallationRepositories(_) => None,
        }
    }

    /// The repository this event belongs to, if it is repo-scoped.
    pub fn repo(&self) -> Option<&RepoId> {
        match self {
            RepoEvent::Push(e) => Some(&e.repo),
            RepoEvent::Issue(e) => Some(&e.repo),
            RepoEvent::PullRequest(e) => Some(&e.repo),
            RepoEvent::Installation(_) | RepoEvent::InstallationRepositories(_) => None,
        }
    }
}

/// A commit reference inside a push payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    /// The full commit SHA.
    pub id: String,
    /// The commit message (may span multiple lines; rendering takes the first).
    pub message: String,
    /// Web URL of the commit.
    pub url: String,
}

/// A push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    pub repo: RepoId,

    /// Branch name with the `refs/heads/` prefix already stripped.
    pub branch: String,

    /// Commits included in the push, in payload order.
    pub commits: Vec<CommitRef>,

    /// The head commit, when GitHub includes one (absent for e.g. branch
    /// deletions).
    pub head_commit: Option<CommitRef>,

    /// Login of the user who pushed.
    pub sender: String,
}

/// Actions forwarded for issue and pull request events.
///
/// This is the noise filter from the ingestion contract: everything else
/// (labeled, assigned, synchronize, ...) is dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueAction {
    Opened,
    Closed,
    Reopened,
    Edited,
}

impl IssueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueAction::Opened => "opened",
            IssueAction::Closed => "closed",
            IssueAction::Reopened => "reopened",
            IssueAction::Edited => "edited",
        }
    }
}

/// An issue event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    pub repo: RepoId,
    pub action: IssueAction,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    /// GitHub-reported issue state ("open" / "closed").
    pub state: String,
    pub sender: String,
}

/// A pull request event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub repo: RepoId,
    pub action: IssueAction,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: String,
    /// True when a `closed` action was a merge.
    pub merged: bool,
    pub sender: String,
}

/// Action on an app installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationAction {
    Created,
    Deleted,
}

/// An app installation event (`installation` webhook, created/deleted only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationEvent {
    pub action: InstallationAction,
    pub installation_id: i64,
    pub account_login: String,
    pub account_id: i64,
}

/// An `installation_repositories` event. Logged only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRepositoriesEvent {
    /// Raw action string ("added" / "removed").
    pub action: String,
    pub account_login: String,
}
