//! Scheduler service: runs passes under one lock, dispatches slot changes after.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{DeviceSettings, MemoryLevel};
use crate::core::{
    ConcurrencyManager, ContextAssignment, Job, JobKey, JobQueue, SchedulerError, SlotExecutor,
    Spawn, WorkType,
};
use crate::runtime::api::{PackageSnapshot, SchedulerSnapshot, SlotSnapshot, WorkTypeCount};
use crate::util::serde::UserId;

/// Event-driven front of a [`ConcurrencyManager`].
///
/// Every trigger locks the manager, mutates state, runs one pass and releases
/// the lock before any slot change reaches the executor. Changes produced by
/// one trigger are applied in order on a single spawned task.
pub struct JobScheduler<Q, E, S>
where
    Q: JobQueue,
    E: SlotExecutor,
    S: Spawn,
{
    manager: Arc<Mutex<ConcurrencyManager<Q>>>,
    executor: E,
    spawner: S,
}

impl<Q, E, S> Clone for JobScheduler<Q, E, S>
where
    Q: JobQueue,
    E: SlotExecutor,
    S: Spawn + Clone,
{
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            executor: self.executor.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

impl<Q, E, S> JobScheduler<Q, E, S>
where
    Q: JobQueue,
    E: SlotExecutor,
    S: Spawn,
{
    /// Wrap a manager.
    pub fn new(manager: ConcurrencyManager<Q>, executor: E, spawner: S) -> Self {
        Self {
            manager: Arc::new(Mutex::new(manager)),
            executor,
            spawner,
        }
    }

    /// Run `f` with the scheduler lock held.
    pub fn with_manager<R>(&self, f: impl FnOnce(&mut ConcurrencyManager<Q>) -> R) -> R {
        f(&mut self.manager.lock())
    }

    fn trigger(&self, event: &str, f: impl FnOnce(&mut ConcurrencyManager<Q>)) -> usize {
        let changes = {
            let mut manager = self.manager.lock();
            f(&mut manager);
            manager.assign_jobs_to_contexts()
        };
        tracing::debug!(event, changes = changes.len(), "pass triggered");
        self.dispatch(changes)
    }

    fn dispatch(&self, changes: Vec<ContextAssignment>) -> usize {
        let count = changes.len();
        if count == 0 {
            return 0;
        }
        let executor = self.executor.clone();
        self.spawner.spawn(async move {
            for change in changes {
                executor.apply(change).await;
            }
        });
        count
    }

    /// Queue a newly eligible job and run a pass. Returns the number of slot
    /// changes dispatched.
    pub fn on_job_added(&self, job: Job) -> usize {
        self.on_jobs_added([job])
    }

    /// Queue several jobs and run a single pass.
    pub fn on_jobs_added(&self, jobs: impl IntoIterator<Item = Job>) -> usize {
        self.trigger("jobs_added", |m| {
            for job in jobs {
                m.pending_mut().add(Arc::new(job));
            }
        })
    }

    /// Drop a job whether it is pending or running. A running job is stopped
    /// before the pass's own changes are applied.
    pub fn on_job_cancelled(&self, key: &JobKey) -> usize {
        let changes: Vec<ContextAssignment> = {
            let mut manager = self.manager.lock();
            manager.pending_mut().remove(key);
            let stop = manager.stop_job(key, "cancelled").ok();
            stop.into_iter()
                .chain(manager.assign_jobs_to_contexts())
                .collect()
        };
        self.dispatch(changes)
    }

    /// A running job finished on its own; free its slot and run a pass.
    ///
    /// # Errors
    /// [`SchedulerError::NotRunning`] if the job holds no slot. No pass runs.
    pub fn on_job_finished(&self, key: &JobKey) -> Result<usize, SchedulerError> {
        let changes = {
            let mut manager = self.manager.lock();
            manager.on_job_completed(key)?;
            manager.assign_jobs_to_contexts()
        };
        Ok(self.dispatch(changes))
    }

    /// Stop a running job for `reason`, then run a pass.
    ///
    /// # Errors
    /// [`SchedulerError::NotRunning`] if the job holds no slot.
    pub fn stop_running_job(&self, key: &JobKey, reason: &str) -> Result<usize, SchedulerError> {
        let changes: Vec<ContextAssignment> = {
            let mut manager = self.manager.lock();
            let stop = manager.stop_job(key, reason)?;
            std::iter::once(stop)
                .chain(manager.assign_jobs_to_contexts())
                .collect()
        };
        Ok(self.dispatch(changes))
    }

    /// Apply a new settings snapshot.
    pub fn on_settings_changed(&self, settings: &DeviceSettings) -> usize {
        self.trigger("settings_changed", |m| m.update_config(settings))
    }

    /// Apply a new memory-pressure level.
    pub fn on_memory_level_changed(&self, level: MemoryLevel) -> usize {
        self.trigger("memory_level_changed", |m| m.set_memory_level(level))
    }

    /// Apply a screen state change.
    pub fn on_interactive_changed(&self, on: bool) -> usize {
        self.trigger("interactive_changed", |m| m.set_interactive(on))
    }

    /// The foreground user changed. The user directory must already report
    /// `new_user` as current.
    pub fn on_user_switched(&self, new_user: UserId) -> usize {
        self.trigger("user_switched", |m| {
            m.grace_observer().on_user_switch_complete(new_user);
        })
    }

    /// A user was removed from the device.
    pub fn on_user_removed(&self, user_id: UserId) -> usize {
        self.trigger("user_removed", |m| {
            m.grace_observer().on_user_removed(user_id);
        })
    }

    /// Run a pass without any state change.
    pub fn run_pass(&self) -> usize {
        self.trigger("explicit", |_| {})
    }

    /// See [`ConcurrencyManager::is_pkg_concurrency_limited`].
    pub fn is_pkg_concurrency_limited(&self, job: &Job) -> bool {
        self.manager.lock().is_pkg_concurrency_limited(job)
    }

    /// See [`ConcurrencyManager::should_run_as_fg_user_job`].
    pub fn should_run_as_fg_user_job(&self, job: &Job) -> bool {
        self.manager.lock().should_run_as_fg_user_job(job)
    }

    /// Point-in-time view for diagnostics.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let manager = self.manager.lock();
        let active = manager.active_config();
        let slots: Vec<SlotSnapshot> = manager
            .running_jobs()
            .map(|(slot, running)| SlotSnapshot {
                slot,
                job: running.job.key(),
                package: running.job.source_package().to_string(),
                work_type: running.work_type,
                started_at_ms: running.started_at_ms,
            })
            .collect();
        let work_types = WorkType::ALL
            .into_iter()
            .map(|work_type| WorkTypeCount {
                work_type,
                running: u32::try_from(slots.iter().filter(|s| s.work_type == work_type).count())
                    .unwrap_or(u32::MAX),
                min: active.min_reserved(work_type),
                max: active.max_allowed(work_type),
            })
            .collect();
        let mut packages: Vec<PackageSnapshot> = manager
            .package_stats_table()
            .iter()
            .map(|(key, stats)| PackageSnapshot {
                user_id: key.user_id,
                package: key.package.clone(),
                stats: *stats,
            })
            .collect();
        packages.sort_by(|a, b| (a.user_id, &a.package).cmp(&(b.user_id, &b.package)));
        SchedulerSnapshot {
            profile: manager.active_profile(),
            max_total: active.max_total(),
            package_limits: manager.package_limits(),
            pending: manager.pending().len(),
            slots,
            work_types,
            packages,
        }
    }
}
