//! Command execution: maps parsed commands onto the account linker and
//! subscription manager and turns the outcomes into reply text.

use tracing::error;

use crate::accounts::{AccountLinker, LinkError};
use crate::subscriptions::{SubscribeError, SubscriptionManager};
use crate::types::{ChatId, ChatKind, UserId};

use super::parser::{parse_command, Command};

pub struct CommandHandler {
    linker: AccountLinker,
    subscriptions: SubscriptionManager,
}

impl CommandHandler {
    pub fn new(linker: AccountLinker, subscriptions: SubscriptionManager) -> Self {
        CommandHandler {
            linker,
            subscriptions,
        }
    }

    /// Handles one message. Returns the reply text, or `None` when the
    /// message is not a command for this bot.
    pub async fn handle(
        &self,
        chat_id: ChatId,
        chat_kind: ChatKind,
        user_id: UserId,
        text: &str,
    ) -> Option<String> {
        let command = match parse_command(text) {
            Ok(Some(command)) => command,
            Ok(None) => return None,
            Err(usage) => return Some(usage.to_string()),
        };

        let reply = match command {
            Command::Help => HELP_TEXT.to_string(),
            Command::Bind => self.bind(user_id).await,
            Command::Unbind => self.unbind(user_id).await,
            Command::Subscribe { repo, flags } => {
                match self
                    .subscriptions
                    .subscribe(chat_id, chat_kind, user_id, &repo, flags)
                    .await
                {
                    Ok(()) => format!(
                        "Subscribed to <b>{repo}</b> for: {}.",
                        flags.labels().join(", ")
                    ),
                    Err(e) => subscribe_error_reply(e),
                }
            }
            Command::Unsubscribe { repo } => {
                match self
                    .subscriptions
                    .unsubscribe(chat_id, chat_kind, user_id, &repo)
                    .await
                {
                    Ok(true) => format!("Unsubscribed from <b>{repo}</b>."),
                    Ok(false) => format!("This chat is not subscribed to <b>{repo}</b>."),
                    Err(e) => subscribe_error_reply(e),
                }
            }
            Command::List => match self.subscriptions.list(chat_id).await {
                Ok(subs) if subs.is_empty() => {
                    "No subscriptions in this chat. Use /subscribe to add one.".to_string()
                }
                Ok(subs) => {
                    let mut out = String::from("Subscriptions in this chat:\n");
                    for sub in subs {
                        out.push_str(&format!(
                            "• <b>{}</b> ({})\n",
                            sub.repo_id(),
                            sub.flags().labels().join(", ")
                        ));
                    }
                    out
                }
                Err(e) => {
                    error!(error = %e, "listing subscriptions failed");
                    "Something went wrong, try again later.".to_string()
                }
            },
        };
        Some(reply)
    }

    async fn bind(&self, user_id: UserId) -> String {
        match self.linker.start_handshake(user_id).await {
            Ok(ticket) => format!(
                "Authorize access to your GitHub account within the next 10 minutes:\n{}",
                ticket.authorize_url
            ),
            Err(LinkError::AlreadyBound) => {
                "Your account is already linked. Use /unbind first to relink.".to_string()
            }
            Err(e) => {
                error!(error = %e, "starting handshake failed");
                "Something went wrong, try again later.".to_string()
            }
        }
    }

    async fn unbind(&self, user_id: UserId) -> String {
        match self.linker.unbind(user_id).await {
            Ok(true) => {
                "Account unlinked. Subscriptions you created were removed.".to_string()
            }
            Ok(false) => "No linked account to remove.".to_string(),
            Err(e) => {
                error!(error = %e, "unbind failed");
                "Something went wrong, try again later.".to_string()
            }
        }
    }
}

fn subscribe_error_reply(error: SubscribeError) -> String {
    match error {
        SubscribeError::NotBound => {
            "Link your GitHub account first with /bind.".to_string()
        }
        SubscribeError::NotAdmin => {
            "Only chat administrators can manage subscriptions here.".to_string()
        }
        SubscribeError::InsufficientPermission { repo } => format!(
            "You need write or admin access to <b>{repo}</b> to subscribe."
        ),
        SubscribeError::AppNotInstalled { owner, install_url } => format!(
            "The app is not installed for <b>{owner}</b>. Install it first:\n{install_url}"
        ),
        SubscribeError::Store(e) => {
            error!(error = %e, "subscription storage failed");
            "Something went wrong, try again later.".to_string()
        }
    }
}

const HELP_TEXT: &str = "<b>Commands</b>\n\
/bind — link your GitHub account\n\
/unbind — unlink it and remove your subscriptions\n\
/subscribe owner/repo commit,issue,pr — watch a repository\n\
/unsubscribe owner/repo — stop watching\n\
/list — subscriptions in this chat";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{ExchangeError, OauthProvider, ProviderIdentity};
    use crate::github::{PermissionGate, PermissionLevel};
    use crate::storage::{Database, Installation};
    use crate::subscriptions::ChatMemberGate;
    use crate::types::RepoId;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubOauth;

    #[async_trait]
    impl OauthProvider for StubOauth {
        fn authorize_url(&self, state: &str) -> String {
            format!("https://example.test/authorize?state={state}")
        }

        async fn exchange_code(&self, _code: &str) -> Result<ProviderIdentity, ExchangeError> {
            Ok(ProviderIdentity {
                provider_user_id: "gh-1".into(),
                provider_username: "alice".into(),
                access_token: "gho_abc".into(),
            })
        }
    }

    struct FixedPermission(PermissionLevel);

    #[async_trait]
    impl PermissionGate for FixedPermission {
        async fn check_repo_permission(&self, _t: &str, _r: &RepoId) -> PermissionLevel {
            self.0
        }
    }

    struct FixedAdmin(bool);

    #[async_trait]
    impl ChatMemberGate for FixedAdmin {
        async fn is_chat_admin(&self, _c: ChatId, _u: UserId) -> bool {
            self.0
        }
    }

    async fn handler(level: PermissionLevel) -> (CommandHandler, Database) {
        let db = Database::open_in_memory().await.unwrap();
        let linker = AccountLinker::new(db.clone(), Arc::new(StubOauth));
        let subscriptions = SubscriptionManager::new(
            db.clone(),
            Arc::new(FixedPermission(level)),
            Arc::new(FixedAdmin(true)),
            "gitgram".into(),
        );
        (CommandHandler::new(linker, subscriptions), db)
    }

    async fn bind_via_commands(handler: &CommandHandler, linker_db: &Database, user: UserId) {
        let reply = handler
            .handle(ChatId(1), ChatKind::Private, user, "/bind")
            .await
            .unwrap();
        // Pull the state token out of the authorize URL in the reply
        let state = reply.rsplit("state=").next().unwrap().trim().to_string();
        let linker = AccountLinker::new(linker_db.clone(), Arc::new(StubOauth));
        linker.complete_handshake(&state, "code").await.unwrap();
    }

    #[tokio::test]
    async fn non_command_text_gets_no_reply() {
        let (handler, _db) = handler(PermissionLevel::Admin).await;
        let reply = handler
            .handle(ChatId(1), ChatKind::Private, UserId(5), "good morning")
            .await;
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn bind_reply_contains_authorize_url() {
        let (handler, _db) = handler(PermissionLevel::Admin).await;
        let reply = handler
            .handle(ChatId(1), ChatKind::Private, UserId(5), "/bind")
            .await
            .unwrap();
        assert!(reply.contains("https://example.test/authorize?state="));
    }

    #[tokio::test]
    async fn subscribe_unbound_points_at_bind() {
        let (handler, _db) = handler(PermissionLevel::Admin).await;
        let reply = handler
            .handle(
                ChatId(1),
                ChatKind::Private,
                UserId(5),
                "/subscribe acme/widgets commit",
            )
            .await
            .unwrap();
        assert!(reply.contains("/bind"));
    }

    #[tokio::test]
    async fn subscribe_flow_and_list() {
        let (handler, db) = handler(PermissionLevel::Write).await;
        bind_via_commands(&handler, &db, UserId(5)).await;
        db.upsert_installation(&Installation {
            installation_id: 1,
            account_login: "acme".into(),
            account_id: 100,
        })
        .await
        .unwrap();

        let reply = handler
            .handle(
                ChatId(1),
                ChatKind::Private,
                UserId(5),
                "/subscribe acme/widgets commit,pr",
            )
            .await
            .unwrap();
        assert!(reply.contains("Subscribed to <b>acme/widgets</b>"));

        let listing = handler
            .handle(ChatId(1), ChatKind::Private, UserId(5), "/list")
            .await
            .unwrap();
        assert!(listing.contains("acme/widgets"));
        assert!(listing.contains("commit, pr"));
    }

    #[tokio::test]
    async fn subscribe_without_install_links_install_page() {
        let (handler, db) = handler(PermissionLevel::Admin).await;
        bind_via_commands(&handler, &db, UserId(5)).await;

        let reply = handler
            .handle(
                ChatId(1),
                ChatKind::Private,
                UserId(5),
                "/subscribe acme/widgets commit",
            )
            .await
            .unwrap();
        assert!(reply.contains("https://github.com/apps/gitgram/installations/new"));
    }

    #[tokio::test]
    async fn usage_error_becomes_reply() {
        let (handler, _db) = handler(PermissionLevel::Admin).await;
        let reply = handler
            .handle(ChatId(1), ChatKind::Private, UserId(5), "/subscribe")
            .await
            .unwrap();
        assert!(reply.contains("usage: /subscribe"));
    }

    #[tokio::test]
    async fn unsubscribe_missing_reports_not_subscribed() {
        let (handler, _db) = handler(PermissionLevel::Admin).await;
        let reply = handler
            .handle(
                ChatId(1),
                ChatKind::Private,
                UserId(5),
                "/unsubscribe acme/widgets",
            )
            .await
            .unwrap();
        assert!(reply.contains("not subscribed"));
    }
}
