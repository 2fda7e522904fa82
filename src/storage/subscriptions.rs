//! Queries for the subscription table.

use crate::types::{ChatId, EventKind, RepoId};

use super::models::Subscription;
use super::{Database, DatabaseError};

impl Database {
    /// Inserts or replaces a subscription.
    ///
    /// The unique key is (chat_id, owner, repo); a resubscribe from the same
    /// chat replaces the event flags and creator wholesale.
    pub async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO subscriptions
                 (chat_id, chat_kind, owner, repo, wants_commit, wants_issue, wants_pr, created_by)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (chat_id, owner, repo) DO UPDATE SET
                 chat_kind = excluded.chat_kind,
                 wants_commit = excluded.wants_commit,
                 wants_issue = excluded.wants_issue,
                 wants_pr = excluded.wants_pr,
                 created_by = excluded.created_by",
        )
        .bind(subscription.chat_id)
        .bind(&subscription.chat_kind)
        .bind(&subscription.owner)
        .bind(&subscription.repo)
        .bind(subscription.wants_commit)
        .bind(subscription.wants_issue)
        .bind(subscription.wants_pr)
        .bind(subscription.created_by)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Deletes one subscription. Returns whether a row existed.
    pub async fn delete_subscription(
        &self,
        chat_id: ChatId,
        repo: &RepoId,
    ) -> Result<bool, DatabaseError> {
        let removed = sqlx::query(
            "DELETE FROM subscriptions WHERE chat_id = ? AND owner = ? AND repo = ?",
        )
        .bind(chat_id.0)
        .bind(&repo.owner)
        .bind(&repo.repo)
        .execute(self.pool())
        .await?
        .rows_affected();
        Ok(removed > 0)
    }

    /// All subscriptions held by one chat, ordered for stable listing.
    pub async fn subscriptions_for_chat(
        &self,
        chat_id: ChatId,
    ) -> Result<Vec<Subscription>, DatabaseError> {
        let rows = sqlx::query_as::<_, Subscription>(
            "SELECT chat_id, chat_kind, owner, repo,
                    wants_commit, wants_issue, wants_pr, created_by
             FROM subscriptions WHERE chat_id = ?
             ORDER BY owner, repo",
        )
        .bind(chat_id.0)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Chats subscribed to `repo` for the given event kind.
    pub async fn subscribers_for(
        &self,
        repo: &RepoId,
        kind: EventKind,
    ) -> Result<Vec<Subscription>, DatabaseError> {
        let flag_column = match kind {
            EventKind::Commit => "wants_commit",
            EventKind::Issue => "wants_issue",
            EventKind::Pr => "wants_pr",
        };
        let rows = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT chat_id, chat_kind, owner, repo,
                    wants_commit, wants_issue, wants_pr, created_by
             FROM subscriptions
             WHERE owner = ? AND repo = ? AND {flag_column} = 1"
        ))
        .bind(&repo.owner)
        .bind(&repo.repo)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
