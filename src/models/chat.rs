use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::Sender;

/// One line of a chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub message: String,
    #[serde(deserialize_with = "super::timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Stamp a message with the current client time.
    pub fn now(sender: Sender, message: impl Into<String>) -> Self {
        Self {
            sender,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Body of `POST /chat`. `session_id` is null on the first turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub patient_id: String,
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub ai_response: String,
    /// Echo of the patient's message.
    #[serde(default)]
    pub message: Option<String>,
}

/// One row of a patient's chat session listing, most recent first.
///
/// The backend groups stored messages by session and reports the group
/// key as `_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSessionSummary {
    #[serde(rename = "_id", alias = "session_id")]
    pub session_id: String,
    #[serde(deserialize_with = "super::timestamp::deserialize")]
    pub last_message: DateTime<Utc>,
    pub message_count: u32,
}
