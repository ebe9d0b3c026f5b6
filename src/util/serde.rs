//! Identity types shared across the scheduler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Android-style user identifier.
pub type UserId = i32;

/// Application uid. Encodes the owning user as `uid / PER_USER_RANGE`.
pub type Uid = i32;

/// Number of uids reserved per user.
pub const PER_USER_RANGE: Uid = 100_000;

/// Sentinel for "no user".
pub const USER_NULL: UserId = -10_000;

/// User that owns `uid`.
pub const fn user_id_of(uid: Uid) -> UserId {
    uid / PER_USER_RANGE
}

/// App id portion of `uid`, shared by the same app across users.
pub const fn app_id_of(uid: Uid) -> i32 {
    uid % PER_USER_RANGE
}

/// Compose a uid from a user and an app id.
pub const fn uid_for(user_id: UserId, app_id: i32) -> Uid {
    user_id * PER_USER_RANGE + app_id % PER_USER_RANGE
}

/// Key identifying a package installed for a specific user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserPackage {
    /// Owning user.
    pub user_id: UserId,
    /// Package name.
    pub package: String,
}

impl UserPackage {
    /// Build a key from its parts.
    pub fn new(user_id: UserId, package: impl Into<String>) -> Self {
        Self {
            user_id,
            package: package.into(),
        }
    }
}

impl fmt::Display for UserPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>{}", self.user_id, self.package)
    }
}

/// Index of an execution slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}
