//! Operations callers perform on behalf of a signed-in user.

mod messages;
mod participants;
mod threads;

pub use messages::{MessageService, NewMessage};
pub use participants::ParticipantService;
pub use threads::{NewThread, ThreadChanges, ThreadService};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

/// The user an operation is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    #[serde(default)]
    pub role: Role,
}

impl Actor {
    pub fn member(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Member,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and admins may manage a resource.
    pub fn may_manage(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_permissions() {
        let owner = Uuid::new_v4();
        assert!(Actor::member(owner).may_manage(owner));
        assert!(!Actor::member(Uuid::new_v4()).may_manage(owner));
        assert!(Actor::admin(Uuid::new_v4()).may_manage(owner));
    }

    #[test]
    fn test_role_defaults_to_member() {
        let id = Uuid::new_v4();
        let actor: Actor = serde_json::from_value(serde_json::json!({ "user_id": id })).unwrap();
        assert_eq!(actor.role, Role::Member);
    }
}
