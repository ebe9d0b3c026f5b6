//! Pass-scoped slot assignment records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::work_type::WorkType;
use crate::core::Job;
use crate::util::serde::SlotId;

/// A job occupying an execution slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningJob {
    /// The job.
    pub job: Arc<Job>,
    /// Bucket the job was admitted under.
    pub work_type: WorkType,
    /// When the job was dispatched, in clock milliseconds.
    pub started_at_ms: u128,
}

/// What a [`ContextAssignment`] asks the execution layer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
    /// Nothing changes.
    Keep,
    /// Start `new_job` on an empty slot.
    Start,
    /// Stop `old_job`, leaving the slot empty.
    Stop,
    /// Stop `old_job` and start `new_job` on the same slot.
    Replace,
}

/// A proposed transition of one execution slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextAssignment {
    /// The slot.
    pub slot: SlotId,
    /// Job occupying the slot when the pass began.
    pub old_job: Option<Arc<Job>>,
    /// Bucket of `old_job`.
    pub old_work_type: WorkType,
    /// Job the slot should run after the change.
    pub new_job: Option<Arc<Job>>,
    /// Bucket `new_job` is admitted under.
    pub new_work_type: WorkType,
    /// Why `old_job` may be stopped, decided while preparing the pass.
    pub stop_reason: Option<String>,
    /// Why `old_job` was actually preempted.
    pub preempt_reason: Option<String>,
}

impl ContextAssignment {
    /// Empty slot with no proposal yet.
    pub const fn idle(slot: SlotId) -> Self {
        Self {
            slot,
            old_job: None,
            old_work_type: WorkType::None,
            new_job: None,
            new_work_type: WorkType::None,
            stop_reason: None,
            preempt_reason: None,
        }
    }

    /// Occupied slot that keeps its job unless the pass decides otherwise.
    pub fn occupied(slot: SlotId, running: &RunningJob, stop_reason: Option<String>) -> Self {
        Self {
            slot,
            old_job: Some(Arc::clone(&running.job)),
            old_work_type: running.work_type,
            new_job: Some(Arc::clone(&running.job)),
            new_work_type: running.work_type,
            stop_reason,
            preempt_reason: None,
        }
    }

    /// Classify the transition.
    pub fn kind(&self) -> AssignmentKind {
        match (&self.old_job, &self.new_job) {
            (None, None) => AssignmentKind::Keep,
            (Some(old), Some(new)) if old.key() == new.key() => AssignmentKind::Keep,
            (None, Some(_)) => AssignmentKind::Start,
            (Some(_), None) => AssignmentKind::Stop,
            (Some(_), Some(_)) => AssignmentKind::Replace,
        }
    }

    /// Bias of the occupant, or `i32::MIN` for an empty slot.
    pub(crate) fn old_bias(&self) -> i32 {
        self.old_job.as_ref().map_or(i32::MIN, |j| j.bias())
    }
}

/// Slots partitioned at the start of a pass.
///
/// `idle.len() + preferred_uid_only.len() + stoppable.len()` always equals the
/// number of execution slots.
#[derive(Debug, Clone, Default)]
pub struct AssignmentBuckets {
    /// Empty slots.
    pub idle: Vec<ContextAssignment>,
    /// Running slots only a same-uid, higher-bias pending job may take.
    pub preferred_uid_only: Vec<ContextAssignment>,
    /// Running slots that may be handed to a different app.
    pub stoppable: Vec<ContextAssignment>,
}

impl AssignmentBuckets {
    /// Slots across all three buckets.
    pub fn total(&self) -> usize {
        self.idle.len() + self.preferred_uid_only.len() + self.stoppable.len()
    }
}
