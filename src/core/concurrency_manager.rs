//! Slot admission: which pending jobs start, which wait, which running jobs yield.
//!
//! A pass runs in two phases under the scheduler lock. Phase A
//! ([`ConcurrencyManager::prepare_for_assignment_determination`]) counts work by
//! type and partitions the execution slots into idle, same-app-only and
//! stoppable buckets. Phase B ([`ConcurrencyManager::determine_assignments`])
//! walks the pending queue in priority order and hands out slots. The resulting
//! changes are committed to slot occupancy right away, so a started or
//! replacing job provisionally owns its slot before the execution layer has
//! acted on it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{
    ConcurrencyConfig, ConfigProfile, DeviceSettings, MemoryLevel, PackageLimits, WorkTypeConfig,
    WorkTypeConfigSet, STANDARD_CONCURRENCY_LIMIT,
};
use crate::core::audit::{build_audit_event, AuditSink};
use crate::core::work_count::WorkCountTracker;
use crate::core::work_type::{classify, UserStanding, WorkType, WorkTypes};
use crate::core::{
    AssignmentBuckets, AssignmentKind, ContextAssignment, GracePeriodObserver, Job, JobKey,
    JobQueue, PackageStats, PackageStatsTable, RunningJob, SchedulerError, UserDirectory,
    BIAS_TOP_APP,
};
use crate::util::clock::Clock;
use crate::util::serde::{SlotId, UserId, UserPackage};

/// Number of execution slots. Active totals never exceed it.
pub const SLOT_COUNT: usize = STANDARD_CONCURRENCY_LIMIT as usize;

const REASON_TOO_MANY_RUNNING: &str = "too many jobs running";
const REASON_SAME_APP: &str = "higher bias job from same app";

#[derive(Debug, Clone, Copy)]
struct ScreenState {
    requested_on: bool,
    effective_on: bool,
    changed_at_ms: u128,
    off_delay_ms: u128,
}

/// Admission-control state for every execution slot.
///
/// Not internally synchronized: the owner wraps it in a single coarse lock
/// (see [`crate::runtime::JobScheduler`]).
pub struct ConcurrencyManager<Q: JobQueue> {
    pending: Q,
    slots: Vec<Option<RunningJob>>,
    running_index: HashMap<JobKey, SlotId>,
    package_stats: PackageStatsTable,
    configs: WorkTypeConfigSet,
    profile: ConfigProfile,
    tracker: WorkCountTracker,
    pkg_limits: PackageLimits,
    grace: Arc<GracePeriodObserver>,
    users: Arc<dyn UserDirectory>,
    restrict_background_users: bool,
    memory_level: MemoryLevel,
    screen: ScreenState,
    /// Classification of each pending job, fixed for the duration of a pass.
    pass_types: HashMap<JobKey, WorkTypes>,
    clock: Arc<dyn Clock>,
    audit: Option<Box<dyn AuditSink>>,
}

impl<Q: JobQueue> ConcurrencyManager<Q> {
    /// Create a manager with built-in quota defaults, the screen on and normal
    /// memory pressure.
    ///
    /// # Errors
    /// [`SchedulerError::Config`] if `config` fails validation.
    pub fn new(
        config: &ConcurrencyConfig,
        pending: Q,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::Config)?;
        let grace = Arc::new(GracePeriodObserver::new(
            users.current_user_id(),
            config.user_grace_period_ms,
            Arc::clone(&clock),
        ));
        let configs = WorkTypeConfigSet::new();
        let profile = ConfigProfile::for_state(true, MemoryLevel::Normal);
        let mut tracker = WorkCountTracker::new();
        tracker.set_config(configs.get(profile));
        let now = clock.now_ms();
        Ok(Self {
            pending,
            slots: vec![None; SLOT_COUNT],
            running_index: HashMap::new(),
            package_stats: PackageStatsTable::new(),
            configs,
            profile,
            tracker,
            pkg_limits: PackageLimits::default(),
            grace,
            users,
            restrict_background_users: config.restrict_background_users,
            memory_level: MemoryLevel::Normal,
            screen: ScreenState {
                requested_on: true,
                effective_on: true,
                changed_at_ms: now,
                off_delay_ms: u128::from(config.screen_off_adjustment_delay_ms),
            },
            pass_types: HashMap::new(),
            clock,
            audit: None,
        })
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Pending queue.
    pub const fn pending(&self) -> &Q {
        &self.pending
    }

    /// Pending queue, for the upstream job store to add and cancel jobs.
    pub const fn pending_mut(&mut self) -> &mut Q {
        &mut self.pending
    }

    /// Shared grace-period observer, fed by user-switch events.
    pub fn grace_observer(&self) -> Arc<GracePeriodObserver> {
        Arc::clone(&self.grace)
    }

    /// Profile whose quotas are in force.
    pub const fn active_profile(&self) -> ConfigProfile {
        self.profile
    }

    /// Quotas in force.
    pub const fn active_config(&self) -> &WorkTypeConfig {
        self.configs.get(self.profile)
    }

    /// Quotas for every profile.
    pub const fn configs(&self) -> &WorkTypeConfigSet {
        &self.configs
    }

    /// Per-package limits in force.
    pub const fn package_limits(&self) -> PackageLimits {
        self.pkg_limits
    }

    /// Work-type accounting of the most recent pass.
    pub const fn work_count(&self) -> &WorkCountTracker {
        &self.tracker
    }

    /// Occupied slot count.
    pub fn running_count(&self) -> usize {
        self.running_index.len()
    }

    /// Running jobs with their slots, in slot order.
    pub fn running_jobs(&self) -> impl Iterator<Item = (SlotId, &RunningJob)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|r| (SlotId(i), r)))
    }

    /// Running job by key.
    pub fn running_job(&self, key: &JobKey) -> Option<&RunningJob> {
        let slot = self.running_index.get(key)?;
        self.slots.get(slot.0)?.as_ref()
    }

    /// Counters of one package, if it has any.
    pub fn package_stats(&self, user_id: UserId, package: &str) -> Option<&PackageStats> {
        self.package_stats.get(&UserPackage::new(user_id, package))
    }

    /// Counters of one package, created on demand.
    pub fn package_stats_mut(&mut self, user_id: UserId, package: &str) -> &mut PackageStats {
        self.package_stats
            .get_or_create(&UserPackage::new(user_id, package))
    }

    /// Every package with non-zero counters.
    pub const fn package_stats_table(&self) -> &PackageStatsTable {
        &self.package_stats
    }

    /// Re-derive every quota profile and the package limits from `settings`.
    /// Malformed keys fall back to defaults.
    pub fn update_config(&mut self, settings: &DeviceSettings) {
        self.configs.update(settings);
        self.pkg_limits = PackageLimits::from_settings(settings);
        self.refresh_profile();
        self.tracker.set_config(self.configs.get(self.profile));
        let active = self.active_config();
        tracing::info!(
            profile = %self.profile.identifier(),
            max_total = active.max_total(),
            pkg_limit_ej = self.pkg_limits.ej,
            pkg_limit_regular = self.pkg_limits.regular,
            "concurrency config updated"
        );
    }

    /// Record a new device memory-pressure level.
    pub fn set_memory_level(&mut self, level: MemoryLevel) {
        self.memory_level = level;
        self.refresh_profile();
    }

    /// Record a screen state change. Turning on applies at once; turning off
    /// applies once the adjustment delay has elapsed.
    pub fn set_interactive(&mut self, on: bool) {
        if on == self.screen.requested_on {
            return;
        }
        self.screen.requested_on = on;
        self.screen.changed_at_ms = self.clock.now_ms();
        if on {
            self.screen.effective_on = true;
        }
        self.refresh_profile();
    }

    fn refresh_profile(&mut self) {
        let screen = &mut self.screen;
        if !screen.requested_on
            && screen.effective_on
            && self.clock.now_ms() >= screen.changed_at_ms + screen.off_delay_ms
        {
            screen.effective_on = false;
        }
        let profile = ConfigProfile::for_state(screen.effective_on, self.memory_level);
        if profile != self.profile {
            tracing::info!(
                from = %self.profile.identifier(),
                to = %profile.identifier(),
                "switching concurrency profile"
            );
            self.profile = profile;
            self.tracker.set_config(self.configs.get(profile));
        }
    }

    /// How the scheduler regards `user_id`.
    ///
    /// Profiles are judged by their parent. Everyone is foreground when
    /// background-user restriction is off.
    pub fn user_standing(&self, user_id: UserId) -> UserStanding {
        if !self.restrict_background_users {
            return UserStanding::Foreground;
        }
        let owner = self
            .users
            .user_info(user_id)
            .map_or(user_id, |info| info.standing_owner());
        if owner == self.users.current_user_id()
            || self.users.user_info(owner).is_some_and(|info| info.is_primary)
        {
            return UserStanding::Foreground;
        }
        if self.grace.is_within_grace_period_for_user(owner) {
            UserStanding::GracePeriod
        } else {
            UserStanding::Background
        }
    }

    /// Whether `job` is treated as work of a foreground user: the current user,
    /// a profile of it, the primary user, or a user inside its grace period.
    pub fn should_run_as_fg_user_job(&self, job: &Job) -> bool {
        !matches!(
            self.user_standing(job.source_user_id()),
            UserStanding::Background
        )
    }

    /// Work types `job` may run as right now.
    pub fn classify_job(&self, job: &Job) -> WorkTypes {
        classify(job, self.user_standing(job.source_user_id()))
    }

    /// Whether `job`'s package is already at its concurrency limit for the job's
    /// urgency class. Staged jobs of an in-progress pass count; pending ones
    /// do not.
    pub fn is_pkg_concurrency_limited(&self, job: &Job) -> bool {
        if job.is_top_bias() {
            return false;
        }
        let max_total = self.active_config().max_total() as usize;
        if self.pending.len() + self.running_count() < max_total {
            // Spare slots for everyone; nothing to protect.
            return false;
        }
        self.package_stats
            .get(&job.user_package())
            .is_some_and(|stats| {
                stats.committed(job.is_expedited())
                    >= self.pkg_limits.for_class(job.is_expedited())
            })
    }

    /// Phase A: count work by type and partition every slot.
    ///
    /// Empty slots are idle. An occupied slot is stoppable when it has a stop
    /// reason; otherwise only a higher-bias job of the same uid may take it.
    pub fn prepare_for_assignment_determination(&mut self) -> AssignmentBuckets {
        self.refresh_profile();
        self.tracker.reset_counts();
        self.tracker.set_config(self.configs.get(self.profile));
        for running in self.slots.iter().flatten() {
            self.tracker.increment_running_job_count(running.work_type);
        }
        self.pass_types.clear();
        for job in self.pending.snapshot() {
            let types = self.classify_job(&job);
            self.tracker.increment_pending_job_count(types);
            self.pass_types.insert(job.key(), types);
        }
        self.tracker.on_count_done();

        let running_count = self.running_count();
        let mut buckets = AssignmentBuckets::default();
        for (i, slot) in self.slots.iter().enumerate() {
            let id = SlotId(i);
            match slot {
                None => buckets.idle.push(ContextAssignment::idle(id)),
                Some(running) => {
                    let reason = self.stop_reason(running, running_count);
                    let stoppable = reason.is_some();
                    let assignment = ContextAssignment::occupied(id, running, reason);
                    if stoppable {
                        buckets.stoppable.push(assignment);
                    } else {
                        buckets.preferred_uid_only.push(assignment);
                    }
                }
            }
        }
        tracing::debug!(
            idle = buckets.idle.len(),
            preferred_uid_only = buckets.preferred_uid_only.len(),
            stoppable = buckets.stoppable.len(),
            pending = self.pending.len(),
            "prepared assignment buckets"
        );
        buckets
    }

    fn stop_reason(&self, running: &RunningJob, running_count: usize) -> Option<String> {
        let work_type = running.work_type;
        if running_count > self.active_config().max_total() as usize
            || self.tracker.is_over_type_limit(work_type)
        {
            return Some(REASON_TOO_MANY_RUNNING.to_string());
        }
        if running.job.is_expedited() {
            // Only urgent work may displace an expedited job.
            if matches!(work_type, WorkType::BgUserImportant | WorkType::BgUser) {
                if self.tracker.pending_count(WorkType::BgUserImportant) > 0 {
                    return Some(blocking(WorkType::BgUserImportant));
                }
                if self.tracker.pending_count(WorkType::Ej) > 0
                    && self
                        .tracker
                        .can_job_start_replacing(WorkTypes::EJ, work_type)
                        != WorkType::None
                {
                    return Some(blocking(WorkType::Ej));
                }
            } else if self.tracker.pending_count(WorkType::Ej) > 0 {
                return Some(blocking(WorkType::Ej));
            }
            return None;
        }
        if self.tracker.pending_count(work_type) > 0 {
            return Some(blocking(work_type));
        }
        WorkType::ALL
            .into_iter()
            .find(|&other| {
                self.tracker.pending_count(other) > 0
                    && self.tracker.can_job_start_replacing(other.mask(), work_type)
                        != WorkType::None
            })
            .map(blocking)
    }

    fn admit_type(&self, types: WorkTypes, is_top: bool, replacing: Option<WorkType>) -> WorkType {
        let work_type = match replacing {
            Some(old) => self.tracker.can_job_start_replacing(types, old),
            None => self.tracker.can_job_start(types),
        };
        if work_type == WorkType::None && is_top {
            WorkType::Top
        } else {
            work_type
        }
    }

    /// Whether a non-TOP `job` starting as `work_type` may take the slot of a
    /// stoppable occupant. An equal-bias job only displaces another to lift its
    /// type to the minimum.
    fn may_displace(&self, job: &Job, work_type: WorkType, occupant: &ContextAssignment) -> bool {
        if occupant.stop_reason.as_deref() == Some(REASON_TOO_MANY_RUNNING) {
            return true;
        }
        self.tracker.is_above_min_reserved(occupant.old_work_type)
            && (self.tracker.is_below_min_reserved(work_type) || job.bias() > occupant.old_bias())
    }

    /// Phase B: walk pending jobs in priority order and hand out slots.
    ///
    /// Returns the changed assignments. Slots taken from `buckets` are removed
    /// from it; what remains stays as it is.
    pub fn determine_assignments(
        &mut self,
        buckets: &mut AssignmentBuckets,
    ) -> Vec<ContextAssignment> {
        let mut changed = Vec::new();
        let mut projected_running = self.running_count();
        let max_total = self.active_config().max_total() as usize;

        for job in self.pending.snapshot() {
            let key = job.key();
            if self.running_index.contains_key(&key) {
                continue;
            }
            let types = match self.pass_types.get(&key) {
                Some(types) => *types,
                None => self.classify_job(&job),
            };
            let is_top = types.has(WorkType::Top);
            if !is_top && self.is_pkg_concurrency_limited(&job) {
                tracing::trace!(job = %job, "package at concurrency limit");
                continue;
            }

            let mut selected = None;

            // TOP skips type quotas but never the total.
            if !buckets.idle.is_empty() && projected_running < max_total {
                let work_type = self.admit_type(types, is_top, None);
                if work_type != WorkType::None {
                    let mut assignment = buckets.idle.remove(0);
                    assignment.new_job = Some(Arc::clone(&job));
                    assignment.new_work_type = work_type;
                    self.tracker.stage_job(work_type, types);
                    projected_running += 1;
                    selected = Some(assignment);
                }
            }

            if selected.is_none() {
                let same_app = buckets
                    .preferred_uid_only
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| {
                        a.old_job
                            .as_ref()
                            .is_some_and(|old| old.uid() == job.uid() && old.bias() < job.bias())
                    })
                    .min_by_key(|(_, a)| a.old_bias())
                    .map(|(i, a)| (i, a.old_work_type));
                if let Some((i, old_type)) = same_app {
                    // A same-app swap may always inherit the occupant's bucket.
                    let work_type = match self.admit_type(types, is_top, Some(old_type)) {
                        WorkType::None if types.has(old_type) => old_type,
                        work_type => work_type,
                    };
                    if work_type != WorkType::None {
                        let mut assignment = buckets.preferred_uid_only.remove(i);
                        assignment.new_job = Some(Arc::clone(&job));
                        assignment.new_work_type = work_type;
                        assignment.preempt_reason = Some(REASON_SAME_APP.to_string());
                        self.tracker.stage_replacement(old_type, work_type, types);
                        selected = Some(assignment);
                    }
                }
            }

            if selected.is_none() && !buckets.stoppable.is_empty() {
                let in_overage = projected_running > SLOT_COUNT;
                let victim = buckets
                    .stoppable
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| {
                        if is_top {
                            a.old_bias() < job.bias()
                        } else {
                            !in_overage && a.old_bias() < BIAS_TOP_APP
                        }
                    })
                    .filter_map(|(i, a)| {
                        let work_type = self.admit_type(types, is_top, Some(a.old_work_type));
                        (work_type != WorkType::None).then_some((i, work_type, a))
                    })
                    .filter(|(_, work_type, a)| is_top || self.may_displace(&job, *work_type, a))
                    .min_by_key(|(_, _, a)| {
                        (
                            !self.tracker.is_above_min_reserved(a.old_work_type),
                            a.old_bias(),
                            a.slot,
                        )
                    })
                    .map(|(i, work_type, _)| (i, work_type));
                if let Some((i, work_type)) = victim {
                    let mut assignment = buckets.stoppable.remove(i);
                    assignment.preempt_reason.clone_from(&assignment.stop_reason);
                    assignment.new_job = Some(Arc::clone(&job));
                    assignment.new_work_type = work_type;
                    self.tracker
                        .stage_replacement(assignment.old_work_type, work_type, types);
                    selected = Some(assignment);
                }
            }

            if let Some(assignment) = selected {
                self.package_stats
                    .get_or_create(&job.user_package())
                    .adjust_staged_count(true, job.is_expedited());
                tracing::debug!(
                    job = %job,
                    slot = %assignment.slot,
                    work_type = %assignment.new_work_type,
                    kind = ?assignment.kind(),
                    "assigned"
                );
                changed.push(assignment);
            }
        }
        changed
    }

    /// Commit `changed` to slot occupancy and package counters.
    pub fn carry_out_assignment_changes(
        &mut self,
        changed: Vec<ContextAssignment>,
    ) -> Vec<ContextAssignment> {
        let now = self.clock.now_ms();
        for assignment in &changed {
            let Some(new_job) = assignment.new_job.as_ref() else {
                continue;
            };
            if let Some(old_job) = assignment.old_job.as_ref() {
                if assignment.kind() == AssignmentKind::Replace {
                    self.release_slot(&old_job.key());
                    self.record(
                        old_job,
                        assignment.slot,
                        assignment.old_work_type,
                        "preempt",
                        assignment.preempt_reason.clone(),
                    );
                }
            }
            let Some(slot) = self.slots.get_mut(assignment.slot.0) else {
                tracing::error!(slot = %assignment.slot, job = %new_job, "assignment to unknown slot");
                self.tracker.on_staged_job_failed(assignment.new_work_type);
                continue;
            };
            *slot = Some(RunningJob {
                job: Arc::clone(new_job),
                work_type: assignment.new_work_type,
                started_at_ms: now,
            });
            self.running_index.insert(new_job.key(), assignment.slot);
            self.pending.remove(&new_job.key());
            self.tracker.on_job_started(assignment.new_work_type);
            self.package_stats
                .get_or_create(&new_job.user_package())
                .adjust_running_count(true, new_job.is_expedited());
            self.record(new_job, assignment.slot, assignment.new_work_type, "start", None);
        }
        changed
    }

    fn cleanup_after_pass(&mut self) {
        self.package_stats.end_pass();
        self.tracker.reset_staging_count();
        self.pass_types.clear();
    }

    /// Run one full pass and return the slot changes for the execution layer.
    pub fn assign_jobs_to_contexts(&mut self) -> Vec<ContextAssignment> {
        let mut buckets = self.prepare_for_assignment_determination();
        let changed = self.determine_assignments(&mut buckets);
        let changed = self.carry_out_assignment_changes(changed);
        self.cleanup_after_pass();
        tracing::debug!(
            changed = changed.len(),
            running = self.running_count(),
            pending = self.pending.len(),
            "scheduling pass done"
        );
        changed
    }

    /// Place an already-running job in the first free slot, bypassing quotas.
    ///
    /// # Errors
    /// [`SchedulerError::AlreadyRunning`] if the job occupies a slot,
    /// [`SchedulerError::NoIdleSlot`] if every slot is taken.
    pub fn add_running_job(&mut self, job: Arc<Job>) -> Result<SlotId, SchedulerError> {
        let key = job.key();
        if self.running_index.contains_key(&key) {
            return Err(SchedulerError::AlreadyRunning(key.to_string()));
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(SchedulerError::NoIdleSlot)?;
        let slot = SlotId(index);
        let work_type = self.classify_job(&job).first();
        self.pending.remove(&key);
        self.package_stats
            .get_or_create(&job.user_package())
            .adjust_running_count(true, job.is_expedited());
        self.running_index.insert(key, slot);
        self.slots[index] = Some(RunningJob {
            job,
            work_type,
            started_at_ms: self.clock.now_ms(),
        });
        Ok(slot)
    }

    /// Free the slot of a job that finished on its own.
    ///
    /// # Errors
    /// [`SchedulerError::NotRunning`] if the job holds no slot, e.g. because it
    /// was already preempted.
    pub fn on_job_completed(&mut self, key: &JobKey) -> Result<RunningJob, SchedulerError> {
        let (slot, running) = self
            .release_slot(key)
            .ok_or_else(|| SchedulerError::NotRunning(key.to_string()))?;
        self.tracker.on_job_finished(running.work_type);
        self.record(&running.job, slot, running.work_type, "complete", None);
        Ok(running)
    }

    /// Stop a running job on request, freeing its slot immediately.
    ///
    /// # Errors
    /// [`SchedulerError::NotRunning`] if the job holds no slot.
    pub fn stop_job(
        &mut self,
        key: &JobKey,
        reason: impl Into<String>,
    ) -> Result<ContextAssignment, SchedulerError> {
        let (slot, running) = self
            .release_slot(key)
            .ok_or_else(|| SchedulerError::NotRunning(key.to_string()))?;
        let reason = reason.into();
        self.tracker.on_job_finished(running.work_type);
        self.record(
            &running.job,
            slot,
            running.work_type,
            "stop",
            Some(reason.clone()),
        );
        let mut assignment = ContextAssignment::occupied(slot, &running, Some(reason.clone()));
        assignment.new_job = None;
        assignment.new_work_type = WorkType::None;
        assignment.preempt_reason = Some(reason);
        Ok(assignment)
    }

    fn release_slot(&mut self, key: &JobKey) -> Option<(SlotId, RunningJob)> {
        let slot = self.running_index.remove(key)?;
        let running = self.slots.get_mut(slot.0)?.take()?;
        let user_package = running.job.user_package();
        self.package_stats
            .get_or_create(&user_package)
            .adjust_running_count(false, running.job.is_expedited());
        self.package_stats.remove_if_empty(&user_package);
        Some((slot, running))
    }

    fn record(
        &mut self,
        job: &Job,
        slot: SlotId,
        work_type: WorkType,
        action: &str,
        detail: Option<String>,
    ) {
        if let Some(audit) = self.audit.as_mut() {
            audit.record(build_audit_event(job, slot, work_type, action, detail));
        }
    }
}

fn blocking(work_type: WorkType) -> String {
    format!("blocking {work_type} queue")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{UserInfo, BIAS_DEFAULT, BIAS_FOREGROUND_SERVICE};
    use crate::infra::{InMemoryUserDirectory, PendingJobQueue};
    use crate::util::clock::ManualClock;

    fn manager() -> (ConcurrencyManager<PendingJobQueue>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let users = InMemoryUserDirectory::new(0);
        users.add_user(UserInfo {
            is_primary: true,
            ..UserInfo::new(0)
        });
        let mgr = ConcurrencyManager::new(
            &ConcurrencyConfig::default(),
            PendingJobQueue::new(),
            Arc::new(users),
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();
        (mgr, clock)
    }

    fn job(uid: i32, job_id: i32, bias: i32) -> Arc<Job> {
        Arc::new(Job::new(uid, job_id, format!("pkg{uid}")).with_bias(bias))
    }

    #[test]
    fn idle_slots_take_pending_jobs() {
        let (mut mgr, _) = manager();
        mgr.pending_mut().add(job(10_001, 1, BIAS_DEFAULT));
        mgr.pending_mut().add(job(10_002, 1, BIAS_DEFAULT));
        let changed = mgr.assign_jobs_to_contexts();
        assert_eq!(changed.len(), 2);
        assert!(changed.iter().all(|a| a.kind() == AssignmentKind::Start));
        assert_eq!(mgr.running_count(), 2);
        assert!(mgr.pending().is_empty());
        assert_eq!(
            mgr.package_stats(0, "pkg10001").unwrap().num_running_regular,
            1
        );
    }

    #[test]
    fn same_app_higher_bias_replaces_running_job() {
        let (mut mgr, _) = manager();
        // Expedited occupants are only displaced by expedited work.
        for i in 0..SLOT_COUNT {
            let uid = 10_000 + i32::try_from(i).unwrap();
            let running = Job::new(uid, 1, format!("pkg{uid}")).expedited();
            mgr.add_running_job(Arc::new(running)).unwrap();
        }
        mgr.pending_mut().add(job(10_003, 2, BIAS_FOREGROUND_SERVICE));
        let mut buckets = mgr.prepare_for_assignment_determination();
        assert_eq!(buckets.total(), SLOT_COUNT);
        assert_eq!(buckets.preferred_uid_only.len(), SLOT_COUNT);
        let changed = mgr.determine_assignments(&mut buckets);
        assert_eq!(changed.len(), 1);
        let replaced = &changed[0];
        assert_eq!(replaced.kind(), AssignmentKind::Replace);
        assert_eq!(replaced.old_job.as_ref().unwrap().uid(), 10_003);
        assert_eq!(replaced.new_work_type, WorkType::Fgs);
        assert_eq!(replaced.preempt_reason.as_deref(), Some(REASON_SAME_APP));
    }

    #[test]
    fn completion_frees_slot_once() {
        let (mut mgr, _) = manager();
        let j = job(10_001, 1, BIAS_DEFAULT);
        mgr.add_running_job(Arc::clone(&j)).unwrap();
        assert!(matches!(
            mgr.add_running_job(Arc::clone(&j)),
            Err(SchedulerError::AlreadyRunning(_))
        ));
        mgr.on_job_completed(&j.key()).unwrap();
        assert!(mgr.package_stats(0, "pkg10001").is_none());
        assert!(matches!(
            mgr.on_job_completed(&j.key()),
            Err(SchedulerError::NotRunning(_))
        ));
    }

    #[test]
    fn stop_job_produces_stop_assignment() {
        let (mut mgr, _) = manager();
        let j = job(10_001, 1, BIAS_DEFAULT);
        let slot = mgr.add_running_job(Arc::clone(&j)).unwrap();
        let stop = mgr.stop_job(&j.key(), "cancelled").unwrap();
        assert_eq!(stop.slot, slot);
        assert_eq!(stop.kind(), AssignmentKind::Stop);
        assert_eq!(mgr.running_count(), 0);
    }

    #[test]
    fn start_on_unknown_slot_is_unstaged() {
        let (mut mgr, _) = manager();
        let j = job(10_001, 1, BIAS_DEFAULT);
        mgr.pending_mut().add(Arc::clone(&j));
        let mut buckets = mgr.prepare_for_assignment_determination();
        let mut changed = mgr.determine_assignments(&mut buckets);
        assert_eq!(changed.len(), 1);
        let work_type = changed[0].new_work_type;
        assert_eq!(mgr.tracker.staged_count(work_type), 1);

        changed[0].slot = SlotId(SLOT_COUNT);
        mgr.carry_out_assignment_changes(changed);
        assert_eq!(mgr.tracker.staged_count(work_type), 0);
        assert_eq!(mgr.tracker.running_count(work_type), 0);
        assert_eq!(mgr.running_count(), 0);
        assert!(mgr.pending().contains(&j.key()));
    }

    #[test]
    fn top_job_does_not_displace_equal_bias_top_job() {
        let (mut mgr, _) = manager();
        for i in 0..SLOT_COUNT {
            let uid = 10_000 + i32::try_from(i).unwrap();
            mgr.add_running_job(job(uid, 1, BIAS_TOP_APP)).unwrap();
        }
        mgr.pending_mut().add(job(20_000, 1, BIAS_TOP_APP));
        assert!(mgr.assign_jobs_to_contexts().is_empty());
        assert_eq!(mgr.pending().len(), 1);
    }

    #[test]
    fn screen_off_applies_after_delay() {
        let (mut mgr, clock) = manager();
        mgr.set_interactive(false);
        assert_eq!(mgr.active_profile(), ConfigProfile::ScreenOnNormal);
        clock.advance(30_000);
        mgr.prepare_for_assignment_determination();
        assert_eq!(mgr.active_profile(), ConfigProfile::ScreenOffNormal);
        mgr.set_interactive(true);
        assert_eq!(mgr.active_profile(), ConfigProfile::ScreenOnNormal);
        mgr.set_memory_level(MemoryLevel::Critical);
        assert_eq!(mgr.active_profile(), ConfigProfile::ScreenOnCritical);
        assert_eq!(mgr.active_config().max_total(), 8);
    }

    #[test]
    fn unrestricted_users_are_all_foreground() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let config = ConcurrencyConfig {
            restrict_background_users: false,
            ..ConcurrencyConfig::default()
        };
        let mgr = ConcurrencyManager::new(
            &config,
            PendingJobQueue::new(),
            Arc::new(InMemoryUserDirectory::new(0)),
            clock,
        )
        .unwrap();
        assert_eq!(mgr.user_standing(11), UserStanding::Foreground);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ConcurrencyConfig {
            user_grace_period_ms: u64::MAX,
            ..ConcurrencyConfig::default()
        };
        let result = ConcurrencyManager::new(
            &config,
            PendingJobQueue::new(),
            Arc::new(InMemoryUserDirectory::new(0)),
            Arc::new(ManualClock::new(0)),
        );
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }
}
