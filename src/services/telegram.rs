use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::models::{InboundEvent, InboundPayload, Keyboard, OutboundMessage};

/// Errors that can occur when talking to the Telegram Bot API
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// Participant id: the username, or the numeric id when there is none
    pub fn participant_id(&self) -> String {
        self.username.clone().unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// Convert to an inbound event; unsupported updates yield `None`
    pub fn to_event(&self) -> Option<InboundEvent> {
        if let Some(message) = &self.message {
            let sender = message.from.as_ref()?;
            let photo_ref = message
                .photo
                .as_ref()
                .and_then(|sizes| sizes.first())
                .map(|p| p.file_id.clone())
                .filter(|id| !id.is_empty());

            return Some(InboundEvent {
                sender_id: sender.participant_id(),
                channel_ref: message.chat.id,
                payload: InboundPayload::Message {
                    text: message.text.clone().unwrap_or_default(),
                    photo_ref,
                },
            });
        }

        let query = self.callback_query.as_ref()?;
        Some(InboundEvent {
            sender_id: query.from.participant_id(),
            channel_ref: query.message.as_ref().map_or(query.from.id, |m| m.chat.id),
            payload: InboundPayload::Callback {
                data: query.data.clone().unwrap_or_default(),
            },
        })
    }

    pub fn callback_id(&self) -> Option<&str> {
        self.callback_query.as_ref().map(|q| q.id.as_str())
    }
}

#[derive(Debug, Serialize)]
struct InlineButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

fn inline_keyboard(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<InlineButton<'_>>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| InlineButton {
                    text: &b.label,
                    callback_data: &b.data,
                })
                .collect()
        })
        .collect();

    json!({ "inline_keyboard": rows })
}

/// Telegram Bot API client
///
/// Long-polls `getUpdates` and delivers outbound messages with
/// `sendMessage` / `sendPhoto`.
pub struct TelegramClient {
    base_url: String,
    client: Client,
}

impl TelegramClient {
    /// Create a new client; `request_timeout` must exceed the long-poll timeout
    pub fn new(api_url: &str, token: &str, request_timeout: Duration) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            client,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, TelegramError> {
        let url = format!("{}/{}", self.base_url, method);

        let response: ApiResponse<T> = self.client.post(&url).json(body).send().await?.json().await?;

        if !response.ok {
            return Err(TelegramError::ApiError(format!(
                "{} failed: {}",
                method,
                response.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        response
            .result
            .ok_or_else(|| TelegramError::ApiError(format!("{} returned no result", method)))
    }

    /// Username of the bot account
    pub async fn get_me(&self) -> Result<String, TelegramError> {
        let me: User = self.call("getMe", &json!({})).await?;
        Ok(me.participant_id())
    }

    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });

        self.call("getUpdates", &body).await
    }

    pub async fn send(&self, message: &OutboundMessage) -> Result<(), TelegramError> {
        let mut body = match &message.photo_ref {
            Some(photo) => json!({
                "chat_id": message.channel_ref,
                "photo": photo,
                "caption": message.text,
            }),
            None => json!({
                "chat_id": message.channel_ref,
                "text": message.text,
            }),
        };

        if message.markdown {
            body["parse_mode"] = json!("Markdown");
        }
        if let Some(keyboard) = &message.keyboard {
            body["reply_markup"] = inline_keyboard(keyboard);
        }

        let method = if message.is_photo() { "sendPhoto" } else { "sendMessage" };
        let _: Value = self.call(method, &body).await?;

        tracing::debug!("Delivered {} to chat {}", method, message.channel_ref);
        Ok(())
    }

    pub async fn answer_callback(&self, callback_id: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": callback_id }))
            .await?;
        Ok(())
    }
}
