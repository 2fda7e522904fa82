//! Row types for the persistence layer.

use sqlx::FromRow;

use crate::types::{ChatId, EventFlags, RepoId, UserId};

/// A mirrored GitHub App installation.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Installation {
    pub installation_id: i64,
    pub account_login: String,
    pub account_id: i64,
}

/// A chat user's linked GitHub identity.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Credential {
    pub chat_user_id: i64,
    pub provider_user_id: String,
    pub provider_username: String,
    pub access_token: String,
}

/// A pending OAuth handshake. Single use; deleted when redeemed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Handshake {
    pub token: String,
    pub chat_user_id: i64,
    /// Unix timestamp (seconds) after which the handshake is expired.
    pub expires_at: i64,
}

/// A chat's subscription to one repository.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Subscription {
    pub chat_id: i64,
    pub chat_kind: String,
    pub owner: String,
    pub repo: String,
    pub wants_commit: bool,
    pub wants_issue: bool,
    pub wants_pr: bool,
    pub created_by: i64,
}

impl Subscription {
    pub fn chat_id(&self) -> ChatId {
        ChatId(self.chat_id)
    }

    pub fn created_by(&self) -> UserId {
        UserId(self.created_by)
    }

    pub fn repo_id(&self) -> RepoId {
        RepoId::new(self.owner.clone(), self.repo.clone())
    }

    pub fn flags(&self) -> EventFlags {
        EventFlags {
            commit: self.wants_commit,
            issue: self.wants_issue,
            pr: self.wants_pr,
        }
    }
}
