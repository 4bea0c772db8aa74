use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Participant;
use crate::error::PersistError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Active,
    Closed,
    Archived,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadStatus::Active => "active",
            ThreadStatus::Closed => "closed",
            ThreadStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadStatus {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ThreadStatus::Active),
            "closed" => Ok(ThreadStatus::Closed),
            "archived" => Ok(ThreadStatus::Archived),
            other => Err(PersistError::Validation(format!("unknown thread status: {}", other))),
        }
    }
}

/// Write model for the `threads` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub event_id: String,
    pub creator_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(event_id: impl Into<String>, creator_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            event_id: event_id.into(),
            creator_id,
            title: title.into(),
            description: None,
            status: ThreadStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: ThreadStatus) -> Self {
        self.status = status;
        self
    }
}

/// Read model: a thread with its participant list joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadView {
    pub id: Uuid,
    pub event_id: String,
    pub creator_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl ThreadView {
    /// Drops the joined relations.
    pub fn into_record(self) -> Thread {
        Thread {
            id: Some(self.id),
            event_id: self.event_id,
            creator_id: self.creator_id,
            title: self.title,
            description: self.description,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }
}
