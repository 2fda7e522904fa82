//! Webhook ingestion: verify, dedupe, parse, route.
//!
//! The order is fixed. The signature is checked against the raw body before
//! anything is parsed or touched in storage; an invalid delivery leaves no
//! trace. Duplicate delivery IDs and dropped event kinds succeed as no-ops so
//! GitHub does not retry them.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::dispatch::NotificationDispatcher;
use crate::storage::{Database, DatabaseError, Installation};
use crate::types::DeliveryId;
use crate::webhooks::events::InstallationAction;
use crate::webhooks::{parse_webhook, DeliveryDedupe, ParseError, RepoEvent};

#[derive(Debug, Error)]
pub enum IngressError {
    /// The signature, event, or delivery header was absent.
    #[error("required webhook headers missing")]
    MissingHeaders,

    #[error("webhook signature mismatch")]
    SignatureMismatch,

    #[error("payload rejected: {0}")]
    Payload(#[from] ParseError),

    #[error("storage error: {0}")]
    Store(#[from] DatabaseError),
}

pub struct Ingress {
    secret: Vec<u8>,
    db: Database,
    dispatcher: NotificationDispatcher,
    dedupe: Arc<DeliveryDedupe>,
}

impl Ingress {
    pub fn new(secret: Vec<u8>, db: Database, dispatcher: NotificationDispatcher) -> Self {
        Ingress {
            secret,
            db,
            dispatcher,
            dedupe: Arc::new(DeliveryDedupe::new()),
        }
    }

    /// Processes one webhook delivery.
    ///
    /// Success means the delivery was accepted, including the no-op cases
    /// (duplicate, unknown event kind, filtered action, no subscribers).
    pub async fn ingest(
        &self,
        body: &[u8],
        signature: Option<&str>,
        event_kind: Option<&str>,
        delivery_id: Option<&str>,
    ) -> Result<(), IngressError> {
        let (Some(signature), Some(event_kind), Some(delivery_id)) =
            (signature, event_kind, delivery_id)
        else {
            return Err(IngressError::MissingHeaders);
        };

        if !crate::webhooks::verify_signature(body, signature, &self.secret) {
            return Err(IngressError::SignatureMismatch);
        }

        let delivery_id = DeliveryId::new(delivery_id);
        if self.dedupe.is_duplicate(&delivery_id) {
            info!(delivery = %delivery_id, "duplicate delivery ignored");
            return Ok(());
        }

        // Recorded as seen only after handling succeeds; a failed delivery
        // stays unrecorded so the provider's redelivery of it goes through.
        let Some(event) = parse_webhook(event_kind, body)? else {
            debug!(kind = event_kind, delivery = %delivery_id, "dropped event");
            self.dedupe.record(&delivery_id);
            return Ok(());
        };

        match &event {
            RepoEvent::Push(_) | RepoEvent::Issue(_) | RepoEvent::PullRequest(_) => {
                let report = self.dispatcher.dispatch(&event).await?;
                info!(
                    delivery = %delivery_id,
                    delivered = report.delivered,
                    failed = report.failed.len(),
                    "webhook dispatched"
                );
            }
            RepoEvent::Installation(install) => match install.action {
                InstallationAction::Created => {
                    self.db
                        .upsert_installation(&Installation {
                            installation_id: install.installation_id,
                            account_login: install.account_login.clone(),
                            account_id: install.account_id,
                        })
                        .await?;
                    info!(account = %install.account_login, "app installed");
                }
                InstallationAction::Deleted => {
                    let (installs, subs) = self
                        .db
                        .remove_installation_cascade(&install.account_login)
                        .await?;
                    info!(
                        account = %install.account_login,
                        installations = installs,
                        subscriptions = subs,
                        "app uninstalled"
                    );
                }
            },
            RepoEvent::InstallationRepositories(event) => {
                // Account-scoped records; repo membership changes need no
                // bookkeeping here.
                info!(account = %event.account_login, action = %event.action, "installation repositories changed");
            }
        }

        self.dedupe.record(&delivery_id);
        Ok(())
    }
}
