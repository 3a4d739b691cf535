use serde::{Deserialize, Serialize};
use validator::Validate;

/// Button payload that keeps the participant's current photo
pub const KEEP_PHOTO_DATA: &str = "keep_photo";

/// Upper bound Telegram puts on `callback_data`, in bytes
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;

const LIKE_ACTION: &str = "like";
const DISLIKE_ACTION: &str = "dislike";
const SKIP_ACTION: &str = "skip";
const CHOICE_ACTION: &str = "choice";

/// Inbound event handed over by the transport adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender_id: String,
    pub channel_ref: i64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    /// Plain message: text (possibly empty) and an optional uploaded photo
    Message { text: String, photo_ref: Option<String> },
    /// Inline button press
    Callback { data: String },
}

impl InboundEvent {
    pub fn text(sender_id: impl Into<String>, channel_ref: i64, text: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            channel_ref,
            payload: InboundPayload::Message {
                text: text.into(),
                photo_ref: None,
            },
        }
    }

    pub fn photo(sender_id: impl Into<String>, channel_ref: i64, photo_ref: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            channel_ref,
            payload: InboundPayload::Message {
                text: String::new(),
                photo_ref: Some(photo_ref.into()),
            },
        }
    }

    pub fn callback(sender_id: impl Into<String>, channel_ref: i64, data: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            channel_ref,
            payload: InboundPayload::Callback { data: data.into() },
        }
    }
}

/// Decoded button payload
///
/// Every payload carries an explicit tag, so nothing typed by a participant
/// is ever read as an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Like(String),
    Dislike(String),
    KeepPhoto,
    /// Resend the value already stored for the given stage
    Skip(i32),
    /// One of the fixed tokens offered at the sex step
    Choice(String),
    Unknown,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        if data == KEEP_PHOTO_DATA {
            return CallbackAction::KeepPhoto;
        }

        let Some((action, argument)) = data.split_once(';') else {
            return CallbackAction::Unknown;
        };
        if argument.is_empty() {
            return CallbackAction::Unknown;
        }

        match action {
            LIKE_ACTION => CallbackAction::Like(argument.to_string()),
            DISLIKE_ACTION => CallbackAction::Dislike(argument.to_string()),
            SKIP_ACTION => argument
                .parse()
                .map(CallbackAction::Skip)
                .unwrap_or(CallbackAction::Unknown),
            CHOICE_ACTION => CallbackAction::Choice(argument.to_string()),
            _ => CallbackAction::Unknown,
        }
    }

    pub fn like_data(target_id: &str) -> String {
        format!("{};{}", LIKE_ACTION, target_id)
    }

    pub fn dislike_data(target_id: &str) -> String {
        format!("{};{}", DISLIKE_ACTION, target_id)
    }

    pub fn skip_data(stage: i32) -> String {
        format!("{};{}", SKIP_ACTION, stage)
    }

    pub fn choice_data(token: &str) -> String {
        format!("{};{}", CHOICE_ACTION, token)
    }
}

/// Query for inserting the fixed test participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestParticipantQuery {
    pub sex: bool,
}

/// Query for inserting the test participant together with a like
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TestParticipantWithLikeQuery {
    pub sex: bool,
    #[validate(length(min = 1))]
    #[serde(alias = "to_id", rename = "toId")]
    pub to_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_like_and_dislike() {
        assert_eq!(CallbackAction::parse("like;masha"), CallbackAction::Like("masha".into()));
        assert_eq!(CallbackAction::parse("dislike;masha"), CallbackAction::Dislike("masha".into()));
        assert_eq!(CallbackAction::parse(&CallbackAction::like_data("a")), CallbackAction::Like("a".into()));
    }

    #[test]
    fn test_parse_other_payloads() {
        assert_eq!(CallbackAction::parse(KEEP_PHOTO_DATA), CallbackAction::KeepPhoto);
        assert_eq!(CallbackAction::parse("skip;3"), CallbackAction::Skip(3));
        assert_eq!(CallbackAction::parse(&CallbackAction::choice_data("F")), CallbackAction::Choice("F".into()));
    }

    #[test]
    fn test_untagged_payloads_are_unknown() {
        for data in ["Moscow", "like;", "a;b", "skip;three", "choice;", "", "keep_photo;x"] {
            assert_eq!(CallbackAction::parse(data), CallbackAction::Unknown, "{:?}", data);
        }
    }

    #[test]
    fn test_with_like_query_validation() {
        let query = TestParticipantWithLikeQuery { sex: true, to_id: String::new() };
        assert!(query.validate().is_err());

        let query = TestParticipantWithLikeQuery { sex: true, to_id: "masha".into() };
        assert!(query.validate().is_ok());
    }
}
