//! Core scheduling types, seams and the concurrency manager.

pub mod error;
pub mod job;
pub mod work_type;
pub mod package_stats;
pub mod work_count;
pub mod grace_period;
pub mod users;
pub mod job_queue;
pub mod assignment;
pub mod audit;
pub mod executor;
pub mod concurrency_manager;

pub use error::{AppResult, SchedulerError};
pub use job::{
    Job, JobKey, BIAS_BOUND_FOREGROUND_SERVICE, BIAS_DEFAULT, BIAS_FOREGROUND_SERVICE,
    BIAS_SYNC_EXPEDITED, BIAS_SYNC_INITIALIZATION, BIAS_TOP_APP,
};
pub use work_type::{classify, UserStanding, WorkType, WorkTypes, NUM_WORK_TYPES};
pub use package_stats::{PackageStats, PackageStatsTable};
pub use work_count::WorkCountTracker;
pub use grace_period::{GracePeriodObserver, GraceStatus};
pub use users::{UserDirectory, UserInfo};
pub use job_queue::JobQueue;
pub use assignment::{AssignmentBuckets, AssignmentKind, ContextAssignment, RunningJob};
pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, build_audit_event};
pub use executor::{SlotExecutor, Spawn};
pub use concurrency_manager::{ConcurrencyManager, SLOT_COUNT};
