//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of the two Telegram ID spaces
//! (chats and users) and make signatures self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Telegram chat identifier (private chat, group, or supergroup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(n: i64) -> Self {
        ChatId(n)
    }
}

/// A Telegram user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(n: i64) -> Self {
        UserId(n)
    }
}

/// A repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parses `owner/repo`. Rejects empty components and extra slashes.
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, repo) = s.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(RepoId::new(owner, repo))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A GitHub webhook delivery ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub String);

impl DeliveryId {
    pub fn new(s: impl Into<String>) -> Self {
        DeliveryId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_parse_valid() {
        let repo = RepoId::parse("acme/widgets").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.repo, "widgets");
        assert_eq!(repo.to_string(), "acme/widgets");
    }

    #[test]
    fn repo_id_parse_invalid() {
        assert_eq!(RepoId::parse("acme"), None);
        assert_eq!(RepoId::parse("acme/"), None);
        assert_eq!(RepoId::parse("/widgets"), None);
        assert_eq!(RepoId::parse("a/b/c"), None);
        assert_eq!(RepoId::parse(""), None);
    }

    #[test]
    fn ids_display() {
        assert_eq!(ChatId(-100123).to_string(), "-100123");
        assert_eq!(UserId(42).to_string(), "42");
        assert_eq!(DeliveryId::new("abc").to_string(), "abc");
    }
}
