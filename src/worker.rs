use std::time::Duration;
use tracing::Instrument;

use crate::core::Dispatcher;
use crate::services::{TelegramClient, Update};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Poll updates and process them one at a time until Ctrl-C
pub async fn run(telegram: &TelegramClient, dispatcher: &Dispatcher, poll_timeout_secs: u64) {
    let mut offset = 0;

    loop {
        let updates = tokio::select! {
            result = telegram.get_updates(offset, poll_timeout_secs) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, stopping update loop");
                return;
            }
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!("Could not fetch updates: {}", e);
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            process(telegram, dispatcher, &update)
                .instrument(update_span(update.update_id))
                .await;
        }
    }
}

/// Span for one update; `sender` is filled in once the update is decoded
fn update_span(update_id: i64) -> tracing::Span {
    tracing::info_span!(
        "update",
        event_id = %uuid::Uuid::new_v4(),
        update_id,
        sender = tracing::field::Empty,
    )
}

async fn process(telegram: &TelegramClient, dispatcher: &Dispatcher, update: &Update) {
    if let Some(callback_id) = update.callback_id() {
        if let Err(e) = telegram.answer_callback(callback_id).await {
            tracing::error!("Could not answer callback: {}", e);
            return;
        }
    }

    let Some(event) = update.to_event() else {
        tracing::debug!("Skipping unsupported update");
        return;
    };

    tracing::Span::current().record("sender", event.sender_id.as_str());
    tracing::debug!("Handling event");

    let replies = match dispatcher.handle(event).await {
        Ok(replies) => replies,
        Err(e) => {
            // Nothing is sent back for a failed event
            tracing::error!("Could not handle event: {}", e);
            return;
        }
    };

    for reply in &replies {
        if let Err(e) = telegram.send(reply).await {
            tracing::warn!("Could not send message to chat {}: {}", reply.channel_ref, e);
        }
    }
}
