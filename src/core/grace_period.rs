//! Post-user-switch grace windows.
//!
//! When the foreground user changes, the outgoing user keeps elevated standing
//! for a fixed period. Expiry is evaluated lazily when queried; nothing runs in
//! the background.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::Clock;
use crate::util::serde::{UserId, USER_NULL};

/// Where a user stands relative to the grace window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraceStatus {
    /// The user is the current foreground user.
    Active,
    /// The user was switched away from and the window is still open.
    InGracePeriod {
        /// When the window closes, in clock milliseconds.
        expires_at_ms: u128,
    },
    /// No open window.
    Expired,
}

#[derive(Debug)]
struct GraceState {
    current_user: UserId,
    expirations: HashMap<UserId, u128>,
}

/// Tracks grace-window expirations per user.
pub struct GracePeriodObserver {
    state: Mutex<GraceState>,
    grace_period_ms: u128,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for GracePeriodObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GracePeriodObserver")
            .field("state", &*self.state.lock())
            .field("grace_period_ms", &self.grace_period_ms)
            .finish_non_exhaustive()
    }
}

impl GracePeriodObserver {
    /// Observer starting with `current_user` in the foreground.
    pub fn new(current_user: UserId, grace_period_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(GraceState {
                current_user,
                expirations: HashMap::new(),
            }),
            grace_period_ms: u128::from(grace_period_ms),
            clock,
        }
    }

    /// The foreground user switched to `new_user`.
    pub fn on_user_switch_complete(&self, new_user: UserId) {
        let expires_at_ms = self.clock.now_ms() + self.grace_period_ms;
        let mut state = self.state.lock();
        let previous = state.current_user;
        if previous != USER_NULL && previous != new_user {
            state.expirations.insert(previous, expires_at_ms);
        }
        state.expirations.remove(&new_user);
        state.current_user = new_user;
        tracing::info!(previous, new_user, expires_at_ms, "user switch complete");
    }

    /// `user` was removed or stopped; drop any open window.
    pub fn on_user_removed(&self, user: UserId) {
        self.state.lock().expirations.remove(&user);
    }

    /// Whether `user` is current or inside an open grace window.
    pub fn is_within_grace_period_for_user(&self, user: UserId) -> bool {
        !matches!(self.status(user), GraceStatus::Expired)
    }

    /// Grace status of `user`, collecting its entry once expired.
    pub fn status(&self, user: UserId) -> GraceStatus {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        if user == state.current_user {
            return GraceStatus::Active;
        }
        match state.expirations.get(&user).copied() {
            Some(expires_at_ms) if now < expires_at_ms => GraceStatus::InGracePeriod { expires_at_ms },
            Some(_) => {
                state.expirations.remove(&user);
                tracing::debug!(user, "grace period expired");
                GraceStatus::Expired
            }
            None => GraceStatus::Expired,
        }
    }

    /// User the observer considers current.
    pub fn current_user(&self) -> UserId {
        self.state.lock().current_user
    }

    /// Configured window length.
    pub const fn grace_period_ms(&self) -> u128 {
        self.grace_period_ms
    }
}
