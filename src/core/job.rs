//! Jobs as seen by the admission scheduler.
//!
//! A [`Job`] is owned by the upstream job store and shared with the scheduler
//! through `Arc`; the scheduler never copies or mutates it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::serde::{user_id_of, Uid, UserId, UserPackage};

/// Bias of ordinary background work.
pub const BIAS_DEFAULT: i32 = 0;
/// Bias of an expedited sync.
pub const BIAS_SYNC_EXPEDITED: i32 = 10;
/// Bias of a sync initialization.
pub const BIAS_SYNC_INITIALIZATION: i32 = 20;
/// Bias of an app bound to a foreground service.
pub const BIAS_BOUND_FOREGROUND_SERVICE: i32 = 30;
/// Bias of an app running a foreground service.
pub const BIAS_FOREGROUND_SERVICE: i32 = 35;
/// Reserved maximum bias: the app currently on top.
pub const BIAS_TOP_APP: i32 = 40;

/// Unique identity of a job: the scheduling uid plus the app-chosen job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    /// Calling uid.
    pub uid: Uid,
    /// App-assigned job id, unique within the uid.
    pub job_id: i32,
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.uid, self.job_id)
    }
}

/// A unit of background work contending for an execution slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    key: JobKey,
    source_user_id: UserId,
    source_package: String,
    bias: i32,
    expedited: bool,
}

impl Job {
    /// Regular job at default bias whose source user is derived from `uid`.
    pub fn new(uid: Uid, job_id: i32, source_package: impl Into<String>) -> Self {
        Self {
            key: JobKey { uid, job_id },
            source_user_id: user_id_of(uid),
            source_package: source_package.into(),
            bias: BIAS_DEFAULT,
            expedited: false,
        }
    }

    /// Set the last evaluated bias.
    #[must_use]
    pub const fn with_bias(mut self, bias: i32) -> Self {
        self.bias = bias;
        self
    }

    /// Mark the job as expedited.
    #[must_use]
    pub const fn expedited(mut self) -> Self {
        self.expedited = true;
        self
    }

    /// Override the source user (jobs scheduled on behalf of another user).
    #[must_use]
    pub const fn with_source_user(mut self, user_id: UserId) -> Self {
        self.source_user_id = user_id;
        self
    }

    /// Identity.
    pub const fn key(&self) -> JobKey {
        self.key
    }

    /// Scheduling uid.
    pub const fn uid(&self) -> Uid {
        self.key.uid
    }

    /// User the work is done for.
    pub const fn source_user_id(&self) -> UserId {
        self.source_user_id
    }

    /// Package the work is done for.
    pub fn source_package(&self) -> &str {
        &self.source_package
    }

    /// `(user, package)` key used for per-package accounting.
    pub fn user_package(&self) -> UserPackage {
        UserPackage::new(self.source_user_id, self.source_package.clone())
    }

    /// Last evaluated bias. Higher runs first.
    pub const fn bias(&self) -> i32 {
        self.bias
    }

    /// Whether the job is treated as expedited.
    pub const fn is_expedited(&self) -> bool {
        self.expedited
    }

    /// Whether the job belongs to the app currently on top.
    pub const fn is_top_bias(&self) -> bool {
        self.bias >= BIAS_TOP_APP
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} bias={}{}",
            self.key,
            self.source_package,
            self.bias,
            if self.expedited { " EJ" } else { "" }
        )
    }
}
