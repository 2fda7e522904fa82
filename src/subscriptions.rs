//! Subscription lifecycle: the gated create/replace flow, removal, and
//! listing.
//!
//! Creating a subscription runs a fixed sequence of checks and stops at the
//! first failure, writing nothing:
//!
//! 1. the requesting user has a linked GitHub account
//! 2. in group chats, the user is a chat administrator
//! 3. the user has write or admin permission on the repository
//! 4. the GitHub App is installed for the repository owner
//! 5. only then is the subscription upserted

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::github::{install_url, PermissionGate};
use crate::storage::{Database, DatabaseError, Subscription};
use crate::types::{ChatId, ChatKind, EventFlags, RepoId, UserId};

/// Answers "is this user an administrator of this chat". Faked in tests.
#[async_trait]
pub trait ChatMemberGate: Send + Sync {
    async fn is_chat_admin(&self, chat_id: ChatId, user_id: UserId) -> bool;
}

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("user has no linked account")]
    NotBound,

    #[error("user is not a chat administrator")]
    NotAdmin,

    #[error("insufficient permission on {repo}")]
    InsufficientPermission { repo: RepoId },

    /// The app is not installed for the repository owner. Carries the
    /// install page URL so callers can point the user at it.
    #[error("app not installed for {owner}")]
    AppNotInstalled { owner: String, install_url: String },

    #[error("storage error: {0}")]
    Store(#[from] DatabaseError),
}

#[derive(Clone)]
pub struct SubscriptionManager {
    db: Database,
    permissions: Arc<dyn PermissionGate>,
    chat_members: Arc<dyn ChatMemberGate>,
    app_slug: String,
}

impl SubscriptionManager {
    pub fn new(
        db: Database,
        permissions: Arc<dyn PermissionGate>,
        chat_members: Arc<dyn ChatMemberGate>,
        app_slug: String,
    ) -> Self {
        SubscriptionManager {
            db,
            permissions,
            chat_members,
            app_slug,
        }
    }

    /// Creates or replaces the chat's subscription to `repo`.
    ///
    /// A repeat subscribe from the same chat replaces the event flags
    /// wholesale; flags are never merged.
    pub async fn subscribe(
        &self,
        chat_id: ChatId,
        chat_kind: ChatKind,
        user_id: UserId,
        repo: &RepoId,
        flags: EventFlags,
    ) -> Result<(), SubscribeError> {
        let credential = self
            .db
            .get_credential(user_id)
            .await?
            .filter(|c| !c.access_token.is_empty())
            .ok_or(SubscribeError::NotBound)?;

        if chat_kind != ChatKind::Private
            && !self.chat_members.is_chat_admin(chat_id, user_id).await
        {
            return Err(SubscribeError::NotAdmin);
        }

        let level = self
            .permissions
            .check_repo_permission(&credential.access_token, repo)
            .await;
        if !level.can_subscribe() {
            return Err(SubscribeError::InsufficientPermission { repo: repo.clone() });
        }

        if !self.db.is_app_installed(&repo.owner).await? {
            return Err(SubscribeError::AppNotInstalled {
                owner: repo.owner.clone(),
                install_url: install_url(&self.app_slug),
            });
        }

        self.db
            .upsert_subscription(&Subscription {
                chat_id: chat_id.0,
                chat_kind: chat_kind.as_str().to_string(),
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                wants_commit: flags.commit,
                wants_issue: flags.issue,
                wants_pr: flags.pr,
                created_by: user_id.0,
            })
            .await?;

        info!(chat = %chat_id, repo = %repo, events = ?flags.labels(), "subscription stored");
        Ok(())
    }

    /// Removes the chat's subscription to `repo`. Group chats still require
    /// the requester to be an administrator. Returns whether a row existed.
    pub async fn unsubscribe(
        &self,
        chat_id: ChatId,
        chat_kind: ChatKind,
        user_id: UserId,
        repo: &RepoId,
    ) -> Result<bool, SubscribeError> {
        if chat_kind != ChatKind::Private
            && !self.chat_members.is_chat_admin(chat_id, user_id).await
        {
            return Err(SubscribeError::NotAdmin);
        }

        let removed = self.db.delete_subscription(chat_id, repo).await?;
        if removed {
            info!(chat = %chat_id, repo = %repo, "subscription removed");
        }
        Ok(removed)
    }

    pub async fn list(&self, chat_id: ChatId) -> Result<Vec<Subscription>, DatabaseError> {
        self.db.subscriptions_for_chat(chat_id).await
    }
}
