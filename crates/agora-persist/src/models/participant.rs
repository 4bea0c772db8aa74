use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::UserProfile;

/// Membership row in `thread_participants`, keyed by `(thread_id, user_id)`.
///
/// `joined_at` is only written when set; otherwise the column default (if
/// the table has one) applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub thread_id: Uuid,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn new(thread_id: Uuid, user_id: Uuid) -> Self {
        Self {
            thread_id,
            user_id,
            joined_at: None,
        }
    }

    pub fn joined_now(mut self) -> Self {
        self.joined_at = Some(Utc::now());
        self
    }

    pub fn key(&self) -> ParticipantKey {
        ParticipantKey::new(self.thread_id, self.user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantKey {
    pub thread_id: Uuid,
    pub user_id: Uuid,
}

impl ParticipantKey {
    pub fn new(thread_id: Uuid, user_id: Uuid) -> Self {
        Self { thread_id, user_id }
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.thread_id, self.user_id)
    }
}

/// Read model: a membership with the member's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub thread_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl ParticipantView {
    pub fn into_record(self) -> Participant {
        Participant {
            thread_id: self.thread_id,
            user_id: self.user_id,
            joined_at: self.joined_at,
        }
    }

    pub fn key(&self) -> ParticipantKey {
        ParticipantKey::new(self.thread_id, self.user_id)
    }
}
