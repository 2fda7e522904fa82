//! Queries for installations, credentials, and OAuth handshakes.

use crate::types::UserId;

use super::models::{Credential, Handshake, Installation};
use super::{Database, DatabaseError};

impl Database {
    // --- installations -----------------------------------------------------

    /// Inserts or replaces the installation record for an account.
    pub async fn upsert_installation(
        &self,
        installation: &Installation,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO installations (installation_id, account_login, account_id)
             VALUES (?, ?, ?)
             ON CONFLICT (installation_id) DO UPDATE SET
                 account_login = excluded.account_login,
                 account_id = excluded.account_id",
        )
        .bind(installation.installation_id)
        .bind(&installation.account_login)
        .bind(installation.account_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Removes all installations for an account and every subscription to
    /// that account's repositories, in one transaction.
    ///
    /// Returns (installations removed, subscriptions removed).
    pub async fn remove_installation_cascade(
        &self,
        account_login: &str,
    ) -> Result<(u64, u64), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let installs = sqlx::query("DELETE FROM installations WHERE account_login = ?")
            .bind(account_login)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let subs = sqlx::query("DELETE FROM subscriptions WHERE owner = ?")
            .bind(account_login)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok((installs, subs))
    }

    /// Whether the app is installed for the given account.
    pub async fn is_app_installed(&self, account_login: &str) -> Result<bool, DatabaseError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM installations WHERE account_login = ? LIMIT 1")
                .bind(account_login)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.is_some())
    }

    // --- credentials -------------------------------------------------------

    /// Inserts or replaces the credential for a chat user.
    pub async fn upsert_credential(&self, credential: &Credential) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO credentials (chat_user_id, provider_user_id, provider_username, access_token)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (chat_user_id) DO UPDATE SET
                 provider_user_id = excluded.provider_user_id,
                 provider_username = excluded.provider_username,
                 access_token = excluded.access_token",
        )
        .bind(credential.chat_user_id)
        .bind(&credential.provider_user_id)
        .bind(&credential.provider_username)
        .bind(&credential.access_token)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_credential(
        &self,
        chat_user_id: UserId,
    ) -> Result<Option<Credential>, DatabaseError> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT chat_user_id, provider_user_id, provider_username, access_token
             FROM credentials WHERE chat_user_id = ?",
        )
        .bind(chat_user_id.0)
        .fetch_optional(self.pool())
        .await?;
        Ok(credential)
    }

    /// Removes a user's credential and every subscription they created, in
    /// one transaction. Returns whether a credential existed.
    pub async fn remove_credential_cascade(
        &self,
        chat_user_id: UserId,
    ) -> Result<bool, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let removed = sqlx::query("DELETE FROM credentials WHERE chat_user_id = ?")
            .bind(chat_user_id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM subscriptions WHERE created_by = ?")
            .bind(chat_user_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed > 0)
    }

    // --- handshakes --------------------------------------------------------

    /// Stores a pending handshake.
    pub async fn insert_handshake(&self, handshake: &Handshake) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO handshakes (token, chat_user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&handshake.token)
            .bind(handshake.chat_user_id)
            .bind(handshake.expires_at)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Atomically removes and returns the handshake for a token.
    ///
    /// Delete-on-read makes every token single use even under concurrent
    /// callback requests: exactly one caller gets the row.
    pub async fn take_handshake(&self, token: &str) -> Result<Option<Handshake>, DatabaseError> {
        let handshake = sqlx::query_as::<_, Handshake>(
            "DELETE FROM handshakes WHERE token = ?
             RETURNING token, chat_user_id, expires_at",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await?;
        Ok(handshake)
    }

    /// Removes any pending handshakes for a user. Called when starting a new
    /// handshake so only the latest token is redeemable.
    pub async fn clear_handshakes_for(&self, chat_user_id: UserId) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM handshakes WHERE chat_user_id = ?")
            .bind(chat_user_id.0)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
