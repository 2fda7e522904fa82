//! Account linking: binding a chat user to a GitHub identity via the OAuth
//! handshake.
//!
//! The handshake is a single-use token with a ten-minute lifetime. `/bind`
//! mints it and hands the user an authorize URL carrying the token as the
//! OAuth `state`; the callback redeems it. Redemption deletes the row before
//! any other check, so a token can never be redeemed twice regardless of
//! request interleaving.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::storage::{Credential, Database, DatabaseError, Handshake};
use crate::types::UserId;

/// Lifetime of a handshake token.
pub const HANDSHAKE_TTL_SECS: i64 = 600;

const TOKEN_LEN: usize = 32;

/// The identity returned by a successful OAuth code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub provider_user_id: String,
    pub provider_username: String,
    pub access_token: String,
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("code exchange rejected: {0}")]
    Rejected(String),

    #[error("provider request failed: {0}")]
    Http(String),
}

/// The OAuth side of account linking. Implemented for GitHub; faked in tests.
#[async_trait]
pub trait OauthProvider: Send + Sync {
    /// The URL the user visits to authorize, with `state` embedded.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchanges an authorization code for the user's identity and token.
    async fn exchange_code(&self, code: &str) -> Result<ProviderIdentity, ExchangeError>;
}

#[derive(Debug, Error)]
pub enum LinkError {
    /// The user already has a linked account; they must unbind first.
    #[error("account is already bound")]
    AlreadyBound,

    /// The state token was never issued, already used, or superseded.
    #[error("handshake not found")]
    HandshakeNotFound,

    /// The token existed but its TTL had elapsed.
    #[error("handshake expired")]
    HandshakeExpired,

    #[error("code exchange failed: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("storage error: {0}")]
    Store(#[from] DatabaseError),
}

/// A freshly minted handshake, ready to hand to the user.
#[derive(Debug, Clone)]
pub struct HandshakeTicket {
    pub authorize_url: String,
    pub token: String,
}

/// Orchestrates the bind/unbind lifecycle.
#[derive(Clone)]
pub struct AccountLinker {
    db: Database,
    oauth: Arc<dyn OauthProvider>,
}

impl AccountLinker {
    pub fn new(db: Database, oauth: Arc<dyn OauthProvider>) -> Self {
        AccountLinker { db, oauth }
    }

    /// Whether the user has a usable linked account.
    pub async fn is_bound(&self, chat_user_id: UserId) -> Result<bool, DatabaseError> {
        Ok(self
            .db
            .get_credential(chat_user_id)
            .await?
            .is_some_and(|c| !c.access_token.is_empty()))
    }

    /// Starts a handshake for a user.
    ///
    /// Rejects users that are already bound. Any earlier pending handshake
    /// for the same user is invalidated; only the newest token redeems.
    pub async fn start_handshake(
        &self,
        chat_user_id: UserId,
    ) -> Result<HandshakeTicket, LinkError> {
        if self.is_bound(chat_user_id).await? {
            return Err(LinkError::AlreadyBound);
        }

        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        self.db.clear_handshakes_for(chat_user_id).await?;
        self.db
            .insert_handshake(&Handshake {
                token: token.clone(),
                chat_user_id: chat_user_id.0,
                expires_at: Utc::now().timestamp() + HANDSHAKE_TTL_SECS,
            })
            .await?;

        info!(user = %chat_user_id, "started account link handshake");
        Ok(HandshakeTicket {
            authorize_url: self.oauth.authorize_url(&token),
            token,
        })
    }

    /// Redeems a handshake from the OAuth callback.
    ///
    /// The token is consumed unconditionally, even when it turns out to be
    /// expired or the exchange fails; a retry needs a fresh `/bind`.
    pub async fn complete_handshake(
        &self,
        state: &str,
        code: &str,
    ) -> Result<ProviderIdentity, LinkError> {
        let handshake = self
            .db
            .take_handshake(state)
            .await?
            .ok_or(LinkError::HandshakeNotFound)?;

        if handshake.expires_at < Utc::now().timestamp() {
            warn!(user = handshake.chat_user_id, "handshake expired before redemption");
            return Err(LinkError::HandshakeExpired);
        }

        let identity = self.oauth.exchange_code(code).await?;

        self.db
            .upsert_credential(&Credential {
                chat_user_id: handshake.chat_user_id,
                provider_user_id: identity.provider_user_id.clone(),
                provider_username: identity.provider_username.clone(),
                access_token: identity.access_token.clone(),
            })
            .await?;

        info!(
            user = handshake.chat_user_id,
            github = %identity.provider_username,
            "account linked"
        );
        Ok(identity)
    }

    /// Unbinds a user, cascading away every subscription they created.
    /// Returns whether a binding existed.
    pub async fn unbind(&self, chat_user_id: UserId) -> Result<bool, DatabaseError> {
        let removed = self.db.remove_credential_cascade(chat_user_id).await?;
        if removed {
            info!(user = %chat_user_id, "account unlinked");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubOauth {
        result: Result<ProviderIdentity, String>,
    }

    impl StubOauth {
        fn ok(username: &str) -> Self {
            StubOauth {
                result: Ok(ProviderIdentity {
                    provider_user_id: "gh-1".into(),
                    provider_username: username.into(),
                    access_token: "gho_abc".into(),
                }),
            }
        }

        fn failing() -> Self {
            StubOauth {
                result: Err("bad_verification_code".into()),
            }
        }
    }

    #[async_trait]
    impl OauthProvider for StubOauth {
        fn authorize_url(&self, state: &str) -> String {
            format!("https://example.test/authorize?state={state}")
        }

        async fn exchange_code(&self, _code: &str) -> Result<ProviderIdentity, ExchangeError> {
            self.result
                .clone()
                .map_err(ExchangeError::Rejected)
        }
    }

    async fn linker(oauth: StubOauth) -> AccountLinker {
        let db = Database::open_in_memory().await.unwrap();
        AccountLinker::new(db, Arc::new(oauth))
    }

    #[tokio::test]
    async fn full_bind_flow() {
        let linker = linker(StubOauth::ok("alice")).await;
        let user = UserId(5);

        assert!(!linker.is_bound(user).await.unwrap());

        let ticket = linker.start_handshake(user).await.unwrap();
        assert_eq!(ticket.token.len(), TOKEN_LEN);
        assert!(ticket.authorize_url.contains(&ticket.token));

        let identity = linker.complete_handshake(&ticket.token, "code").await.unwrap();
        assert_eq!(identity.provider_username, "alice");
        assert!(linker.is_bound(user).await.unwrap());
    }

    #[tokio::test]
    async fn already_bound_rejected() {
        let linker = linker(StubOauth::ok("alice")).await;
        let user = UserId(5);

        let ticket = linker.start_handshake(user).await.unwrap();
        linker.complete_handshake(&ticket.token, "code").await.unwrap();

        let err = linker.start_handshake(user).await.unwrap_err();
        assert!(matches!(err, LinkError::AlreadyBound));
    }

    #[tokio::test]
    async fn token_is_single_use() {
        let linker = linker(StubOauth::ok("alice")).await;
        let ticket = linker.start_handshake(UserId(5)).await.unwrap();

        linker.complete_handshake(&ticket.token, "code").await.unwrap();
        let err = linker
            .complete_handshake(&ticket.token, "code")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::HandshakeNotFound));
    }

    #[tokio::test]
    async fn unknown_state_rejected() {
        let linker = linker(StubOauth::ok("alice")).await;
        let err = linker
            .complete_handshake("never-issued", "code")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::HandshakeNotFound));
    }

    #[tokio::test]
    async fn expired_handshake_rejected_and_consumed() {
        let linker = linker(StubOauth::ok("alice")).await;
        let db = linker.db.clone();

        db.insert_handshake(&Handshake {
            token: "stale".into(),
            chat_user_id: 5,
            expires_at: Utc::now().timestamp() - 1,
        })
        .await
        .unwrap();

        let err = linker.complete_handshake("stale", "code").await.unwrap_err();
        assert!(matches!(err, LinkError::HandshakeExpired));

        // The row is gone even though redemption failed
        let err = linker.complete_handshake("stale", "code").await.unwrap_err();
        assert!(matches!(err, LinkError::HandshakeNotFound));
    }

    #[tokio::test]
    async fn failed_exchange_leaves_user_unbound() {
        let linker = linker(StubOauth::failing()).await;
        let user = UserId(5);

        let ticket = linker.start_handshake(user).await.unwrap();
        let err = linker
            .complete_handshake(&ticket.token, "code")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::Exchange(_)));
        assert!(!linker.is_bound(user).await.unwrap());
    }

    #[tokio::test]
    async fn rebind_invalidates_previous_token() {
        let linker = linker(StubOauth::ok("alice")).await;
        let user = UserId(5);

        let first = linker.start_handshake(user).await.unwrap();
        let second = linker.start_handshake(user).await.unwrap();

        let err = linker
            .complete_handshake(&first.token, "code")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::HandshakeNotFound));
        assert!(linker.complete_handshake(&second.token, "code").await.is_ok());
    }

    #[tokio::test]
    async fn unbind_reports_existence() {
        let linker = linker(StubOauth::ok("alice")).await;
        let user = UserId(5);

        assert!(!linker.unbind(user).await.unwrap());

        let ticket = linker.start_handshake(user).await.unwrap();
        linker.complete_handshake(&ticket.token, "code").await.unwrap();

        assert!(linker.unbind(user).await.unwrap());
        assert!(!linker.is_bound(user).await.unwrap());
    }
}
