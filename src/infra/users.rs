//! In-memory user directory.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::core::{UserDirectory, UserInfo};
use crate::util::serde::UserId;

#[derive(Debug)]
struct Directory {
    current: UserId,
    users: HashMap<UserId, UserInfo>,
}

/// User directory kept in memory, updated by user lifecycle events.
#[derive(Debug)]
pub struct InMemoryUserDirectory {
    inner: RwLock<Directory>,
}

impl InMemoryUserDirectory {
    /// Directory whose current user is `current`.
    pub fn new(current: UserId) -> Self {
        Self {
            inner: RwLock::new(Directory {
                current,
                users: HashMap::new(),
            }),
        }
    }

    /// Register or replace a user.
    pub fn add_user(&self, info: UserInfo) {
        self.inner.write().users.insert(info.id, info);
    }

    /// Register `profile` as a profile of `parent`.
    pub fn add_profile(&self, profile: UserId, parent: UserId) {
        self.add_user(UserInfo {
            profile_group_id: Some(parent),
            ..UserInfo::new(profile)
        });
    }

    /// Mark `user_id` as the primary user, clearing the flag elsewhere.
    pub fn set_primary(&self, user_id: UserId) {
        let mut inner = self.inner.write();
        for info in inner.users.values_mut() {
            info.is_primary = false;
        }
        inner
            .users
            .entry(user_id)
            .or_insert_with(|| UserInfo::new(user_id))
            .is_primary = true;
    }

    /// Switch the foreground user.
    pub fn set_current_user(&self, user_id: UserId) {
        self.inner.write().current = user_id;
    }

    /// Forget a user.
    pub fn remove_user(&self, user_id: UserId) {
        self.inner.write().users.remove(&user_id);
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn current_user_id(&self) -> UserId {
        self.inner.read().current
    }

    fn user_info(&self, user_id: UserId) -> Option<UserInfo> {
        self.inner.read().users.get(&user_id).copied()
    }
}
