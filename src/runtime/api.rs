//! API-facing request/response models.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigProfile, PackageLimits};
use crate::core::{Job, JobKey, PackageStats, WorkType, BIAS_DEFAULT};
use crate::util::serde::{SlotId, Uid, UserId};

/// Job submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmission {
    /// Scheduling uid.
    pub uid: Uid,
    /// App-assigned job id.
    pub job_id: i32,
    /// Package the work is done for.
    pub package: String,
    /// User the work is done for; derived from `uid` when absent.
    #[serde(default)]
    pub source_user_id: Option<UserId>,
    /// Last evaluated bias.
    #[serde(default = "default_bias")]
    pub bias: i32,
    /// Expedited flag.
    #[serde(default)]
    pub expedited: bool,
}

const fn default_bias() -> i32 {
    BIAS_DEFAULT
}

impl JobSubmission {
    /// Build the scheduler-side job.
    pub fn into_job(self) -> Job {
        let mut job = Job::new(self.uid, self.job_id, self.package).with_bias(self.bias);
        if let Some(user_id) = self.source_user_id {
            job = job.with_source_user(user_id);
        }
        if self.expedited {
            job = job.expedited();
        }
        job
    }
}

/// One occupied slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSnapshot {
    /// Slot.
    pub slot: SlotId,
    /// Occupant.
    pub job: JobKey,
    /// Occupant's package.
    pub package: String,
    /// Bucket the occupant runs under.
    pub work_type: WorkType,
    /// When the occupant was dispatched.
    pub started_at_ms: u128,
}

/// Per-type running count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkTypeCount {
    /// Bucket.
    pub work_type: WorkType,
    /// Running jobs in it.
    pub running: u32,
    /// Active minimum.
    pub min: u32,
    /// Active maximum.
    pub max: u32,
}

/// Counters of one package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSnapshot {
    /// Source user.
    pub user_id: UserId,
    /// Package name.
    pub package: String,
    /// Counters.
    pub stats: PackageStats,
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    /// Active profile.
    pub profile: ConfigProfile,
    /// Active total limit.
    pub max_total: u32,
    /// Per-package limits.
    pub package_limits: PackageLimits,
    /// Pending job count.
    pub pending: usize,
    /// Occupied slots.
    pub slots: Vec<SlotSnapshot>,
    /// Running counts per bucket.
    pub work_types: Vec<WorkTypeCount>,
    /// Packages with non-zero counters, sorted.
    pub packages: Vec<PackageSnapshot>,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Return a health payload.
pub const fn health() -> Health {
    Health { ok: true }
}
