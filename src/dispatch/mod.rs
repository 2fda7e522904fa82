//! Fan-out of webhook events to subscribed chats.
//!
//! The dispatcher resolves subscribers from storage, renders the message
//! once, and delivers concurrently with a bounded limit. A failed delivery
//! to one chat never blocks or cancels the others; failures are recorded in
//! the report and logged.

pub mod render;

pub use render::render_event;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::storage::{Database, DatabaseError};
use crate::types::ChatId;
use crate::webhooks::RepoEvent;

/// Maximum concurrent in-flight deliveries per event.
const MAX_CONCURRENT_DELIVERIES: usize = 8;

/// Sends one message to one chat. Implemented by the Telegram client; faked
/// in tests.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), SendError>;
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SendError(pub String);

/// Outcome of one dispatch: how many chats got the message and which failed.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: Vec<(ChatId, SendError)>,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    db: Database,
    sender: Arc<dyn MessageSender>,
}

impl NotificationDispatcher {
    pub fn new(db: Database, sender: Arc<dyn MessageSender>) -> Self {
        NotificationDispatcher { db, sender }
    }

    /// Delivers `event` to every matching subscriber.
    ///
    /// Only storage errors surface as `Err`; per-chat send failures land in
    /// the report.
    pub async fn dispatch(&self, event: &RepoEvent) -> Result<DeliveryReport, DatabaseError> {
        let (Some(kind), Some(repo)) = (event.event_kind(), event.repo()) else {
            return Ok(DeliveryReport::default());
        };

        let subscribers = self.db.subscribers_for(repo, kind).await?;
        if subscribers.is_empty() {
            debug!(repo = %repo, kind = %kind, "no subscribers for event");
            return Ok(DeliveryReport::default());
        }

        let Some(text) = render_event(event) else {
            return Ok(DeliveryReport::default());
        };
        let text = Arc::new(text);
        let limit = Arc::new(Semaphore::new(MAX_CONCURRENT_DELIVERIES));

        let mut tasks = JoinSet::new();
        for subscription in &subscribers {
            let chat_id = subscription.chat_id();
            let sender = Arc::clone(&self.sender);
            let text = Arc::clone(&text);
            let limit = Arc::clone(&limit);
            tasks.spawn(async move {
                // The semaphore is never closed, so acquire only fails if it
                // were; treat that as a skipped permit and send anyway.
                let _permit = limit.acquire_owned().await;
                (chat_id, sender.send_message(chat_id, &text).await)
            });
        }

        let mut report = DeliveryReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.delivered += 1,
                Ok((chat_id, Err(error))) => {
                    warn!(chat = %chat_id, %error, "notification delivery failed");
                    report.failed.push((chat_id, error));
                }
                Err(join_error) => {
                    warn!(%join_error, "delivery task panicked");
                }
            }
        }

        debug!(
            repo = %repo,
            kind = %kind,
            delivered = report.delivered,
            failed = report.failed.len(),
            "dispatch complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Subscription;
    use crate::types::RepoId;
    use crate::webhooks::events::{IssueAction, IssueEvent, PushEvent};
    use std::sync::Mutex;

    /// Records sends; fails for chats listed in `fail_for`.
    struct SpySender {
        sent: Mutex<Vec<(ChatId, String)>>,
        fail_for: Vec<ChatId>,
    }

    impl SpySender {
        fn new() -> Self {
            SpySender {
                sent: Mutex::new(Vec::new()),
                fail_for: Vec::new(),
            }
        }

        fn failing_for(chats: Vec<ChatId>) -> Self {
            SpySender {
                sent: Mutex::new(Vec::new()),
                fail_for: chats,
            }
        }

        fn sent_chats(&self) -> Vec<ChatId> {
            self.sent.lock().unwrap().iter().map(|(c, _)| *c).collect()
        }
    }

    #[async_trait]
    impl MessageSender for SpySender {
        async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
            if self.fail_for.contains(&chat_id) {
                return Err(SendError("chat not found".into()));
            }
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    async fn seed_subscription(db: &Database, chat_id: i64, commit: bool, issue: bool) {
        db.upsert_subscription(&Subscription {
            chat_id,
            chat_kind: "private".into(),
            owner: "acme".into(),
            repo: "widgets".into(),
            wants_commit: commit,
            wants_issue: issue,
            wants_pr: false,
            created_by: 5,
        })
        .await
        .unwrap();
    }

    fn push_event() -> RepoEvent {
        RepoEvent::Push(PushEvent {
            repo: RepoId::new("acme", "widgets"),
            branch: "main".into(),
            commits: vec![],
            head_commit: None,
            sender: "octocat".into(),
        })
    }

    #[tokio::test]
    async fn delivers_only_to_matching_subscribers() {
        let db = Database::open_in_memory().await.unwrap();
        seed_subscription(&db, 10, true, false).await;
        seed_subscription(&db, 11, true, true).await;
        seed_subscription(&db, 12, false, true).await;

        let sender = Arc::new(SpySender::new());
        let dispatcher = NotificationDispatcher::new(db, sender.clone());

        let report = dispatcher.dispatch(&push_event()).await.unwrap();
        assert_eq!(report.delivered, 2);
        assert!(report.failed.is_empty());

        let mut chats = sender.sent_chats();
        chats.sort_by_key(|c| c.0);
        assert_eq!(chats, vec![ChatId(10), ChatId(11)]);
    }

    #[tokio::test]
    async fn issue_event_reaches_issue_subscribers() {
        let db = Database::open_in_memory().await.unwrap();
        seed_subscription(&db, 10, true, false).await;
        seed_subscription(&db, 12, false, true).await;

        let sender = Arc::new(SpySender::new());
        let dispatcher = NotificationDispatcher::new(db, sender.clone());

        let event = RepoEvent::Issue(IssueEvent {
            repo: RepoId::new("acme", "widgets"),
            action: IssueAction::Opened,
            number: 1,
            title: "Broken".into(),
            html_url: "https://github.com/acme/widgets/issues/1".into(),
            state: "open".into(),
            sender: "octocat".into(),
        });
        let report = dispatcher.dispatch(&event).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(sender.sent_chats(), vec![ChatId(12)]);
    }

    #[tokio::test]
    async fn one_failure_does_not_block_others() {
        let db = Database::open_in_memory().await.unwrap();
        seed_subscription(&db, 10, true, false).await;
        seed_subscription(&db, 11, true, false).await;
        seed_subscription(&db, 12, true, false).await;

        let sender = Arc::new(SpySender::failing_for(vec![ChatId(11)]));
        let dispatcher = NotificationDispatcher::new(db, sender.clone());

        let report = dispatcher.dispatch(&push_event()).await.unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ChatId(11));
    }

    #[tokio::test]
    async fn no_subscribers_is_a_noop() {
        let db = Database::open_in_memory().await.unwrap();
        let sender = Arc::new(SpySender::new());
        let dispatcher = NotificationDispatcher::new(db, sender.clone());

        let report = dispatcher.dispatch(&push_event()).await.unwrap();
        assert_eq!(report.delivered, 0);
        assert!(sender.sent_chats().is_empty());
    }

    #[tokio::test]
    async fn wide_fanout_reaches_everyone() {
        // More subscribers than the concurrency limit
        let db = Database::open_in_memory().await.unwrap();
        for chat in 0..25 {
            seed_subscription(&db, chat, true, false).await;
        }

        let sender = Arc::new(SpySender::new());
        let dispatcher = NotificationDispatcher::new(db, sender.clone());

        let report = dispatcher.dispatch(&push_event()).await.unwrap();
        assert_eq!(report.delivered, 25);
        assert_eq!(sender.sent_chats().len(), 25);
    }
}
