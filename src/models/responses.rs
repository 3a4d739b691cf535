use serde::{Deserialize, Serialize};

/// Inline button: visible label plus the payload sent back when pressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard, one inner vector per row
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn single_row(buttons: Vec<Button>) -> Self {
        Self { rows: vec![buttons] }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// Payload handed to the transport adapter for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel_ref: i64,
    /// Message text, or the caption when `photo_ref` is set
    pub text: String,
    pub photo_ref: Option<String>,
    pub keyboard: Option<Keyboard>,
    pub markdown: bool,
}

impl OutboundMessage {
    pub fn text(channel_ref: i64, text: impl Into<String>) -> Self {
        Self {
            channel_ref,
            text: text.into(),
            photo_ref: None,
            keyboard: None,
            markdown: false,
        }
    }

    pub fn photo(channel_ref: i64, photo_ref: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            channel_ref,
            text: caption.into(),
            photo_ref: Some(photo_ref.into()),
            keyboard: None,
            markdown: true,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Option<Keyboard>) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn with_markdown(mut self) -> Self {
        self.markdown = true;
        self
    }

    pub fn is_photo(&self) -> bool {
        self.photo_ref.is_some()
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Maintenance endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceResponse {
    pub success: bool,
    pub affected: u64,
}
