//! Read-only view of device users consumed by user-standing checks.

use serde::{Deserialize, Serialize};

use crate::util::serde::UserId;

/// What the scheduler needs to know about a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User id.
    pub id: UserId,
    /// Parent user for profiles; `None` for standalone users.
    pub profile_group_id: Option<UserId>,
    /// The device's primary user.
    pub is_primary: bool,
}

impl UserInfo {
    /// Standalone, non-primary user.
    pub const fn new(id: UserId) -> Self {
        Self {
            id,
            profile_group_id: None,
            is_primary: false,
        }
    }

    /// User whose standing this user inherits: its profile parent, or itself.
    pub fn standing_owner(&self) -> UserId {
        self.profile_group_id.unwrap_or(self.id)
    }
}

/// Source of user information, provided by the surrounding system.
pub trait UserDirectory: Send + Sync {
    /// Current foreground user.
    fn current_user_id(&self) -> UserId;
    /// Details of `user_id`, if it exists.
    fn user_info(&self, user_id: UserId) -> Option<UserInfo>;
}
