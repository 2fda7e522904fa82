//! Long-poll loop for incoming bot commands.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::commands::CommandHandler;
use crate::types::{ChatId, ChatKind, UserId};

use super::TelegramApi;

/// Pause before retrying after a failed getUpdates call.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Polls `getUpdates` forever, feeding text messages to the command handler
/// and sending its replies.
///
/// Errors are logged and retried; the loop only ends with the process.
pub async fn run(api: TelegramApi, handler: CommandHandler) {
    let mut offset: i64 = 0;

    loop {
        let updates = match api.get_updates(offset).await {
            Ok(updates) => updates,
            Err(error) => {
                error!(%error, "getUpdates failed");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let Some(text) = message.text.as_deref() else {
                continue;
            };
            let Some(from) = &message.from else {
                continue;
            };
            let Some(chat_kind) = ChatKind::parse(&message.chat.kind) else {
                // Channels and anything unknown are out of scope.
                debug!(kind = %message.chat.kind, "ignoring message from unsupported chat kind");
                continue;
            };

            let chat_id = ChatId(message.chat.id);
            let user_id = UserId(from.id);

            if let Some(reply) = handler.handle(chat_id, chat_kind, user_id, text).await {
                if let Err(error) = api.send(chat_id, &reply).await {
                    warn!(chat = %chat_id, %error, "sending command reply failed");
                }
            }
        }
    }
}
