//! Core domain types shared across the crate.

mod ids;

pub use ids::{ChatId, DeliveryId, RepoId, UserId};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of Telegram chat a subscription lives in.
///
/// Group and supergroup chats require the subscribing user to be a chat
/// administrator; private chats do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
}

impl ChatKind {
    /// Parses the Telegram `chat.type` field. Channels and anything else
    /// unknown return `None`; the bot does not operate in them.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "private" => Some(ChatKind::Private),
            "group" => Some(ChatKind::Group),
            "supergroup" => Some(ChatKind::Supergroup),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
        }
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The event categories a chat can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Push events (one notification per push, not per commit).
    Commit,
    /// Issue lifecycle events.
    Issue,
    /// Pull request lifecycle events.
    Pr,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Commit => "commit",
            EventKind::Issue => "issue",
            EventKind::Pr => "pr",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which event kinds a subscription wants.
///
/// Resubscribing replaces the whole set; flags are never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventFlags {
    pub commit: bool,
    pub issue: bool,
    pub pr: bool,
}

impl EventFlags {
    /// True if at least one kind is selected.
    pub fn any(&self) -> bool {
        self.commit || self.issue || self.pr
    }

    /// The selected kinds as display labels, in a stable order.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.commit {
            out.push("commit");
        }
        if self.issue {
            out.push("issue");
        }
        if self.pr {
            out.push("pr");
        }
        out
    }
}
