use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UserProfile;
use crate::error::PersistError;

/// Upper bound on message content, counted in characters.
pub const MAX_CONTENT_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Discussion,
    Question,
    Announcement,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Discussion => "discussion",
            MessageType::Question => "question",
            MessageType::Announcement => "announcement",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discussion" => Ok(MessageType::Discussion),
            "question" => Ok(MessageType::Question),
            "announcement" => Ok(MessageType::Announcement),
            other => Err(PersistError::Validation(format!("unknown message type: {}", other))),
        }
    }
}

/// Write model for the `messages` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(thread_id: Uuid, sender_id: Uuid, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            thread_id,
            sender_id,
            content: content.into(),
            message_type: MessageType::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn sent_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.updated_at = at;
        self
    }
}

/// Read model: a message with its sender's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sender: Option<UserProfile>,
}

impl MessageView {
    pub fn into_record(self) -> Message {
        Message {
            id: Some(self.id),
            thread_id: self.thread_id,
            sender_id: self.sender_id,
            content: self.content,
            message_type: self.message_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
