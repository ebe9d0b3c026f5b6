//! # Job Admission
//!
//! An admission-control scheduler for background jobs contending for a small,
//! fixed number of execution slots.
//!
//! On every scheduling pass it decides which pending jobs start, which wait and
//! which running jobs are preempted, reconciling:
//!
//! - **A global ceiling** that depends on screen state and memory pressure
//! - **Per-work-type quotas**: minimum reservations and maximum caps for the
//!   TOP, FGS, EJ, BG, BGUSER_IMPORTANT and BGUSER buckets
//! - **Per-package limits**, split between expedited and regular jobs
//! - **Cross-user fairness**, with a grace period for the user switched away from
//! - **Priority bias**: the app on top is never concurrency-limited
//!
//! ## ConcurrencyManager - the pass
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use job_admission::builders::SchedulerBuilder;
//! use job_admission::core::{Job, JobQueue, BIAS_TOP_APP};
//!
//! let mut manager = SchedulerBuilder::default().build_manager()?;
//! manager.pending_mut().add(Arc::new(Job::new(10_042, 1, "com.example")));
//! manager.pending_mut().add(Arc::new(Job::new(10_077, 7, "com.top").with_bias(BIAS_TOP_APP)));
//!
//! for change in manager.assign_jobs_to_contexts() {
//!     println!("{} {:?}", change.slot, change.kind());
//! }
//! ```
//!
//! ## JobScheduler - event-driven service
//!
//! `JobScheduler` owns the manager behind one lock, runs a pass on every event
//! and hands slot changes to a `SlotExecutor` on a spawned task once the lock is
//! released.
//!
//! ```rust,ignore
//! use job_admission::builders::SchedulerBuilder;
//! use job_admission::infra::AssignmentMailbox;
//! use job_admission::runtime::TokioSpawner;
//!
//! let scheduler = SchedulerBuilder::default()
//!     .build(AssignmentMailbox::new(), TokioSpawner::try_current()?)?;
//! scheduler.on_job_added(job);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling types, seams and the concurrency manager.
pub mod core;
/// Settings snapshots, work-type quota profiles and scheduler options.
pub mod config;
/// Builders to construct scheduler components from configuration.
pub mod builders;
/// In-memory adapters: pending queue, slot mailbox, user directory.
pub mod infra;
/// Event-driven service, runtime adapters and API models.
pub mod runtime;
/// Shared utilities.
pub mod util;
