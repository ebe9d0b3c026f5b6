//! Per-pass slot accounting by work type.
//!
//! Reservations are computed once per pass in [`WorkCountTracker::on_count_done`]:
//! running jobs keep their slots, then each type with pending work is topped up
//! to its configured minimum, then leftover slots expand types up to their
//! maximum, always in work-type preference order.

use crate::config::WorkTypeConfig;
use crate::core::work_type::{WorkType, WorkTypes, NUM_WORK_TYPES};

type Counts = [u32; NUM_WORK_TYPES];

/// Running, staged and pending counts per work type plus the reservations
/// derived from them.
#[derive(Debug, Clone, Default)]
pub struct WorkCountTracker {
    config_max_total: u32,
    config_min_reserved: Counts,
    config_max_allowed: Counts,
    num_running: Counts,
    num_starting: Counts,
    num_pending: Counts,
    num_actually_reserved: Counts,
    /// May dip below zero when restored running jobs exceed the active total.
    num_unspecialized_remaining: i64,
}

fn slot_or_log(work_type: WorkType, op: &str) -> Option<usize> {
    let slot = work_type.slot();
    if slot.is_none() {
        tracing::error!(op, "work type NONE passed to work count tracker");
    }
    slot
}

impl WorkCountTracker {
    /// Tracker with no quota configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt the quotas of the active profile.
    pub fn set_config(&mut self, config: &WorkTypeConfig) {
        for (i, wt) in WorkType::ALL.into_iter().enumerate() {
            self.config_min_reserved[i] = config.min_reserved(wt);
            self.config_max_allowed[i] = config.max_allowed(wt);
        }
        self.config_max_total = config.max_total();
        self.num_unspecialized_remaining = i64::from(self.config_max_total);
        for i in 0..NUM_WORK_TYPES {
            self.num_unspecialized_remaining -=
                i64::from(self.num_running[i].max(self.config_min_reserved[i]));
        }
    }

    /// Forget all counts ahead of a fresh pass.
    pub fn reset_counts(&mut self) {
        self.num_actually_reserved = Counts::default();
        self.num_pending = Counts::default();
        self.num_running = Counts::default();
        self.reset_staging_count();
    }

    /// Forget staged jobs once a pass has been carried out.
    pub fn reset_staging_count(&mut self) {
        self.num_starting = Counts::default();
    }

    /// Count a job already occupying a slot.
    pub fn increment_running_job_count(&mut self, work_type: WorkType) {
        if let Some(i) = slot_or_log(work_type, "increment_running") {
            self.num_running[i] += 1;
        }
    }

    /// Count a pending job against every type it could run as.
    pub fn increment_pending_job_count(&mut self, work_types: WorkTypes) {
        self.adjust_pending_job_count(work_types, true);
    }

    /// Remove a pending job from every type it could run as.
    pub fn decrement_pending_job_count(&mut self, work_types: WorkTypes) {
        if self.adjust_pending_job_count(work_types, false) > 1 {
            // The job was counted in several buckets; release the ones it will not use.
            for wt in work_types.types() {
                self.maybe_adjust_reservations(wt);
            }
        }
    }

    fn adjust_pending_job_count(&mut self, work_types: WorkTypes, add: bool) -> usize {
        let mut adjusted = 0;
        for wt in work_types.types() {
            if let Some(i) = wt.slot() {
                if add {
                    self.num_pending[i] += 1;
                } else {
                    self.num_pending[i] = self.num_pending[i].saturating_sub(1);
                }
                adjusted += 1;
            }
        }
        adjusted
    }

    /// Record that a pending job was staged to start as `work_type`.
    pub fn stage_job(&mut self, work_type: WorkType, all_work_types: WorkTypes) {
        let Some(i) = slot_or_log(work_type, "stage_job") else {
            return;
        };
        self.num_starting[i] += 1;
        self.decrement_pending_job_count(all_work_types);
        if self.num_starting[i] + self.num_running[i] > self.num_actually_reserved[i] {
            self.num_unspecialized_remaining -= 1;
        }
    }

    /// Record that a running job of `old_type` is replaced by a staged job.
    pub fn stage_replacement(
        &mut self,
        old_type: WorkType,
        new_type: WorkType,
        all_work_types: WorkTypes,
    ) {
        if let Some(i) = old_type.slot() {
            if self.num_running[i] > 0 {
                let was_over = self.num_running[i] + self.num_starting[i]
                    > self.num_actually_reserved[i];
                self.num_running[i] -= 1;
                if was_over {
                    self.num_unspecialized_remaining += 1;
                }
            }
        }
        self.stage_job(new_type, all_work_types);
    }

    /// Undo [`stage_job`](Self::stage_job) for a job that could not be started.
    pub fn on_staged_job_failed(&mut self, work_type: WorkType) {
        let Some(i) = slot_or_log(work_type, "on_staged_job_failed") else {
            return;
        };
        if self.num_starting[i] == 0 {
            tracing::error!(%work_type, "staged job failed but none were staged");
            return;
        }
        self.num_starting[i] -= 1;
        self.maybe_adjust_reservations(work_type);
    }

    /// A staged job actually started.
    pub fn on_job_started(&mut self, work_type: WorkType) {
        let Some(i) = slot_or_log(work_type, "on_job_started") else {
            return;
        };
        self.num_running[i] += 1;
        if self.num_starting[i] == 0 {
            tracing::error!(%work_type, "job started without being staged");
        } else {
            self.num_starting[i] -= 1;
        }
    }

    /// A running job finished and its slot may go to another type.
    pub fn on_job_finished(&mut self, work_type: WorkType) {
        let Some(i) = slot_or_log(work_type, "on_job_finished") else {
            return;
        };
        if self.num_running[i] == 0 {
            tracing::error!(%work_type, "finished job was not counted as running");
            return;
        }
        self.num_running[i] -= 1;
        self.maybe_adjust_reservations(work_type);
    }

    fn maybe_adjust_reservations(&mut self, work_type: WorkType) {
        let Some(i) = work_type.slot() else {
            return;
        };
        // Always keep the configured minimum in case new jobs show up soon.
        let still_needed = self.config_min_reserved[i]
            .max(self.num_running[i] + self.num_starting[i] + self.num_pending[i]);
        if still_needed >= self.num_actually_reserved[i] {
            return;
        }
        self.num_actually_reserved[i] = still_needed;
        // Hand the freed slot to the most preferred type that still wants one.
        let receiver = (0..NUM_WORK_TYPES).find(|&j| {
            let demand = self.num_running[j] + self.num_starting[j] + self.num_pending[j];
            self.num_actually_reserved[j] < self.config_max_allowed[j]
                && demand > self.num_actually_reserved[j]
        });
        match receiver {
            Some(j) => self.num_actually_reserved[j] += 1,
            None => self.num_unspecialized_remaining += 1,
        }
    }

    /// Compute reservations once running and pending jobs have been counted.
    pub fn on_count_done(&mut self) {
        self.num_unspecialized_remaining = i64::from(self.config_max_total);

        for i in 0..NUM_WORK_TYPES {
            self.num_actually_reserved[i] = self.num_running[i];
            self.num_unspecialized_remaining -= i64::from(self.num_running[i]);
        }

        for i in 0..NUM_WORK_TYPES {
            let demand = self.num_running[i] + self.num_pending[i];
            let reserved = self.num_actually_reserved[i];
            if demand > reserved {
                let wanted = i64::from(demand.min(self.config_min_reserved[i])) - i64::from(reserved);
                let grant = wanted.min(self.num_unspecialized_remaining).max(0);
                self.num_actually_reserved[i] += u32::try_from(grant).unwrap_or(0);
                self.num_unspecialized_remaining -= grant;
            }
        }

        for i in 0..NUM_WORK_TYPES {
            let demand = self.num_running[i] + self.num_pending[i];
            let reserved = self.num_actually_reserved[i];
            if demand > reserved {
                let headroom = i64::from(self.config_max_allowed[i]) - i64::from(reserved);
                let wanted = headroom.min(i64::from(demand - reserved));
                let grant = wanted.min(self.num_unspecialized_remaining).max(0);
                self.num_actually_reserved[i] += u32::try_from(grant).unwrap_or(0);
                self.num_unspecialized_remaining -= grant;
            }
        }
    }

    /// Most preferred member of `work_types` with room for one more job, or `None`.
    pub fn can_job_start(&self, work_types: WorkTypes) -> WorkType {
        work_types
            .types()
            .find(|&wt| {
                wt.slot().is_some_and(|i| {
                    let allowed = i64::from(self.config_max_allowed[i]).min(
                        i64::from(self.num_actually_reserved[i]) + self.num_unspecialized_remaining,
                    );
                    i64::from(self.num_running[i] + self.num_starting[i]) < allowed
                })
            })
            .unwrap_or(WorkType::None)
    }

    /// Same as [`can_job_start`](Self::can_job_start) but as if one running job
    /// of `replacing` had already left.
    pub fn can_job_start_replacing(&self, work_types: WorkTypes, replacing: WorkType) -> WorkType {
        match replacing.slot() {
            Some(i) if self.num_running[i] > 0 => {
                let mut hypothetical = self.clone();
                hypothetical.num_running[i] -= 1;
                hypothetical.num_unspecialized_remaining += 1;
                hypothetical.can_job_start(work_types)
            }
            _ => self.can_job_start(work_types),
        }
    }

    /// More jobs of `work_type` are running than its maximum allows.
    pub fn is_over_type_limit(&self, work_type: WorkType) -> bool {
        work_type
            .slot()
            .is_some_and(|i| self.num_running[i] > self.config_max_allowed[i])
    }

    /// Running jobs of `work_type` exceed its configured minimum.
    pub fn is_above_min_reserved(&self, work_type: WorkType) -> bool {
        work_type
            .slot()
            .is_some_and(|i| self.num_running[i] > self.config_min_reserved[i])
    }

    /// Running and staged jobs of `work_type` have not reached its minimum.
    pub fn is_below_min_reserved(&self, work_type: WorkType) -> bool {
        work_type
            .slot()
            .is_some_and(|i| self.num_running[i] + self.num_starting[i] < self.config_min_reserved[i])
    }

    /// Jobs of `work_type` currently running.
    pub fn running_count(&self, work_type: WorkType) -> u32 {
        work_type.slot().map_or(0, |i| self.num_running[i])
    }

    /// Jobs staged as `work_type` in this pass.
    pub fn staged_count(&self, work_type: WorkType) -> u32 {
        work_type.slot().map_or(0, |i| self.num_starting[i])
    }

    /// Pending jobs that could run as `work_type`.
    pub fn pending_count(&self, work_type: WorkType) -> u32 {
        work_type.slot().map_or(0, |i| self.num_pending[i])
    }

    /// Slots currently reserved for `work_type`.
    pub fn reserved_count(&self, work_type: WorkType) -> u32 {
        work_type.slot().map_or(0, |i| self.num_actually_reserved[i])
    }

    /// Slots not reserved for any type.
    pub const fn unspecialized_remaining(&self) -> i64 {
        self.num_unspecialized_remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigProfile, DeviceSettings, WorkTypeConfig};

    fn config(total: u32, min: &[(WorkType, u32)], max: &[(WorkType, u32)]) -> WorkTypeConfig {
        let mut cfg = WorkTypeConfig::new(ConfigProfile::ScreenOnNormal, total, min, max);
        cfg.update(&DeviceSettings::new());
        cfg
    }

    #[test]
    fn pending_jobs_reserve_minimum_then_expand_to_max() {
        let cfg = config(
            6,
            &[(WorkType::Top, 2), (WorkType::Bg, 1)],
            &[(WorkType::Bg, 3)],
        );
        let mut tracker = WorkCountTracker::new();
        tracker.set_config(&cfg);
        tracker.reset_counts();
        for _ in 0..5 {
            tracker.increment_pending_job_count(WorkTypes::BG);
        }
        tracker.on_count_done();

        // No TOP demand, so nothing is held back for it.
        assert_eq!(tracker.reserved_count(WorkType::Top), 0);
        assert_eq!(tracker.reserved_count(WorkType::Bg), 3);
        assert_eq!(tracker.unspecialized_remaining(), 3);

        for _ in 0..3 {
            assert_eq!(tracker.can_job_start(WorkTypes::BG), WorkType::Bg);
            tracker.stage_job(WorkType::Bg, WorkTypes::BG);
        }
        assert_eq!(tracker.can_job_start(WorkTypes::BG), WorkType::None);
        assert_eq!(tracker.can_job_start(WorkTypes::TOP), WorkType::Top);
    }

    #[test]
    fn replacing_frees_a_slot_for_another_type() {
        let cfg = config(2, &[(WorkType::Top, 1)], &[(WorkType::Bg, 2)]);
        let mut tracker = WorkCountTracker::new();
        tracker.set_config(&cfg);
        tracker.reset_counts();
        tracker.increment_running_job_count(WorkType::Bg);
        tracker.increment_running_job_count(WorkType::Bg);
        tracker.increment_pending_job_count(WorkTypes::EJ);
        tracker.on_count_done();

        assert_eq!(tracker.can_job_start(WorkTypes::EJ), WorkType::None);
        assert_eq!(
            tracker.can_job_start_replacing(WorkTypes::EJ, WorkType::Bg),
            WorkType::Ej
        );
    }

    #[test]
    fn first_type_with_room_wins() {
        let cfg = config(4, &[], &[(WorkType::Ej, 1)]);
        let mut tracker = WorkCountTracker::new();
        tracker.set_config(&cfg);
        tracker.reset_counts();
        tracker.increment_running_job_count(WorkType::Ej);
        tracker.increment_pending_job_count(WorkTypes::EJ | WorkTypes::BG);
        tracker.on_count_done();
        assert_eq!(tracker.can_job_start(WorkTypes::EJ | WorkTypes::BG), WorkType::Bg);
    }

    #[test]
    fn below_min_counts_staged_jobs() {
        let cfg = config(4, &[(WorkType::Ej, 2)], &[]);
        let mut tracker = WorkCountTracker::new();
        tracker.set_config(&cfg);
        tracker.reset_counts();
        tracker.increment_running_job_count(WorkType::Ej);
        tracker.increment_pending_job_count(WorkTypes::EJ);
        tracker.on_count_done();
        assert!(tracker.is_below_min_reserved(WorkType::Ej));
        assert!(!tracker.is_below_min_reserved(WorkType::Bg));

        tracker.stage_job(WorkType::Ej, WorkTypes::EJ);
        assert!(!tracker.is_below_min_reserved(WorkType::Ej));
        tracker.on_staged_job_failed(WorkType::Ej);
        assert!(tracker.is_below_min_reserved(WorkType::Ej));
        assert_eq!(tracker.staged_count(WorkType::Ej), 0);
    }

    #[test]
    fn over_type_limit_and_finish() {
        let cfg = config(4, &[], &[(WorkType::Bg, 1)]);
        let mut tracker = WorkCountTracker::new();
        tracker.set_config(&cfg);
        tracker.reset_counts();
        tracker.increment_running_job_count(WorkType::Bg);
        tracker.increment_running_job_count(WorkType::Bg);
        assert!(tracker.is_over_type_limit(WorkType::Bg));
        tracker.on_job_finished(WorkType::Bg);
        assert!(!tracker.is_over_type_limit(WorkType::Bg));
        // Finishing more than ran is logged and ignored.
        tracker.on_job_finished(WorkType::Bg);
        tracker.on_job_finished(WorkType::Bg);
        assert_eq!(tracker.running_count(WorkType::Bg), 0);
    }
}
