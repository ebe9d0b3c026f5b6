//! Work-type quota profiles.
//!
//! Each of the eight screen/memory profiles carries built-in defaults that a
//! [`DeviceSettings`] snapshot may override per key. Overrides are sanitised at
//! computation time: every maximum is clamped to the total, and minimums are
//! granted in work-type preference order until the total runs out, so `TOP`
//! always keeps at least one reserved slot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DeviceSettings;
use crate::core::work_type::{WorkType, NUM_WORK_TYPES};
use crate::core::SchedulerError;

/// Hard ceiling on concurrently running jobs, and the number of execution slots.
pub const STANDARD_CONCURRENCY_LIMIT: u32 = 16;

/// Prefix of `max_total_<profile>` keys.
pub const KEY_PREFIX_MAX_TOTAL: &str = "max_total_";
/// Prefix of `max_<type>_<profile>` keys.
pub const KEY_PREFIX_MAX: &str = "max_";
/// Prefix of `min_<type>_<profile>` keys.
pub const KEY_PREFIX_MIN: &str = "min_";

/// Device memory pressure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLevel {
    /// No pressure.
    #[default]
    Normal,
    /// Moderate pressure.
    Moderate,
    /// Low memory.
    Low,
    /// Critically low memory.
    Critical,
}

/// One of the eight screen/memory states a quota set is defined for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigProfile {
    /// Screen on, normal memory.
    #[default]
    ScreenOnNormal,
    /// Screen on, moderate memory pressure.
    ScreenOnModerate,
    /// Screen on, low memory.
    ScreenOnLow,
    /// Screen on, critical memory.
    ScreenOnCritical,
    /// Screen off, normal memory.
    ScreenOffNormal,
    /// Screen off, moderate memory pressure.
    ScreenOffModerate,
    /// Screen off, low memory.
    ScreenOffLow,
    /// Screen off, critical memory.
    ScreenOffCritical,
}

impl ConfigProfile {
    /// All profiles, in table order.
    pub const ALL: [Self; 8] = [
        Self::ScreenOnNormal,
        Self::ScreenOnModerate,
        Self::ScreenOnLow,
        Self::ScreenOnCritical,
        Self::ScreenOffNormal,
        Self::ScreenOffModerate,
        Self::ScreenOffLow,
        Self::ScreenOffCritical,
    ];

    /// Profile for an effective screen state and memory level.
    pub const fn for_state(screen_on: bool, memory: MemoryLevel) -> Self {
        match (screen_on, memory) {
            (true, MemoryLevel::Normal) => Self::ScreenOnNormal,
            (true, MemoryLevel::Moderate) => Self::ScreenOnModerate,
            (true, MemoryLevel::Low) => Self::ScreenOnLow,
            (true, MemoryLevel::Critical) => Self::ScreenOnCritical,
            (false, MemoryLevel::Normal) => Self::ScreenOffNormal,
            (false, MemoryLevel::Moderate) => Self::ScreenOffModerate,
            (false, MemoryLevel::Low) => Self::ScreenOffLow,
            (false, MemoryLevel::Critical) => Self::ScreenOffCritical,
        }
    }

    /// Suffix used in settings keys.
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::ScreenOnNormal => "screen_on_normal",
            Self::ScreenOnModerate => "screen_on_moderate",
            Self::ScreenOnLow => "screen_on_low",
            Self::ScreenOnCritical => "screen_on_critical",
            Self::ScreenOffNormal => "screen_off_normal",
            Self::ScreenOffModerate => "screen_off_moderate",
            Self::ScreenOffLow => "screen_off_low",
            Self::ScreenOffCritical => "screen_off_critical",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ConfigProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

fn type_key(prefix: &str, work_type: WorkType, profile: ConfigProfile) -> Result<String, SchedulerError> {
    let name = work_type
        .config_name()
        .ok_or_else(|| SchedulerError::InvalidWorkType(work_type.to_string()))?;
    Ok(format!("{prefix}{name}_{}", profile.identifier()))
}

/// Active `{min, max}` quotas per work type and the total ceiling for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkTypeConfig {
    profile: ConfigProfile,
    default_max_total: u32,
    default_min: [u32; NUM_WORK_TYPES],
    default_max: [Option<u32>; NUM_WORK_TYPES],
    max_total: u32,
    min_reserved: [u32; NUM_WORK_TYPES],
    max_allowed: [u32; NUM_WORK_TYPES],
}

impl WorkTypeConfig {
    /// Profile with built-in defaults. Types missing from `default_max` may use
    /// the whole total; types missing from `default_min` reserve nothing.
    pub fn new(
        profile: ConfigProfile,
        default_max_total: u32,
        default_min: &[(WorkType, u32)],
        default_max: &[(WorkType, u32)],
    ) -> Self {
        let mut config = Self {
            profile,
            default_max_total,
            default_min: [0; NUM_WORK_TYPES],
            default_max: [None; NUM_WORK_TYPES],
            max_total: 0,
            min_reserved: [0; NUM_WORK_TYPES],
            max_allowed: [0; NUM_WORK_TYPES],
        };
        for &(wt, min) in default_min {
            if let Some(i) = wt.slot() {
                config.default_min[i] = min;
            }
        }
        for &(wt, max) in default_max {
            if let Some(i) = wt.slot() {
                config.default_max[i] = Some(max);
            }
        }
        config.update(&DeviceSettings::new());
        config
    }

    /// `max_total_<profile>`.
    pub fn key_max_total(profile: ConfigProfile) -> String {
        format!("{KEY_PREFIX_MAX_TOTAL}{}", profile.identifier())
    }

    /// `max_<type>_<profile>`.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidWorkType`] for `WorkType::None`.
    pub fn key_max(work_type: WorkType, profile: ConfigProfile) -> Result<String, SchedulerError> {
        type_key(KEY_PREFIX_MAX, work_type, profile)
    }

    /// `min_<type>_<profile>`.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidWorkType`] for `WorkType::None`.
    pub fn key_min(work_type: WorkType, profile: ConfigProfile) -> Result<String, SchedulerError> {
        type_key(KEY_PREFIX_MIN, work_type, profile)
    }

    /// Recompute the active quotas from `settings`, falling back to the
    /// built-in defaults for missing or malformed keys.
    pub fn update(&mut self, settings: &DeviceSettings) {
        let profile = self.profile;
        let ceiling = i64::from(STANDARD_CONCURRENCY_LIMIT);

        let raw_total = settings.get_int(
            &Self::key_max_total(profile),
            i64::from(self.default_max_total),
        );
        let total = raw_total.clamp(1, ceiling);
        if total != raw_total {
            tracing::warn!(%profile, raw_total, total, "total limit out of range; clamped");
        }
        self.max_total = u32::try_from(total).unwrap_or(STANDARD_CONCURRENCY_LIMIT);

        for (i, wt) in WorkType::ALL.into_iter().enumerate() {
            let default = self.default_max[i].map_or(total, i64::from);
            let raw = Self::key_max(wt, profile).map_or(default, |k| settings.get_int(&k, default));
            let max = raw.clamp(1, total);
            if max != raw {
                tracing::warn!(%profile, work_type = %wt, raw, max, "max slots out of range; clamped");
            }
            self.max_allowed[i] = u32::try_from(max).unwrap_or(1);
        }

        let mut remaining = total;
        // Minimums are granted first come in preference order, not scaled down together.
        for (i, wt) in WorkType::ALL.into_iter().enumerate() {
            let default = i64::from(self.default_min[i]);
            let raw = Self::key_min(wt, profile).map_or(default, |k| settings.get_int(&k, default));
            // TOP keeps at least one slot no matter how the others are configured.
            let floor = i64::from(wt == WorkType::Top);
            let min = raw
                .min(remaining)
                .min(i64::from(self.max_allowed[i]))
                .max(floor);
            if min < raw {
                tracing::warn!(%profile, work_type = %wt, raw, min, "min slots exceed what is left of the total; reduced");
            }
            remaining -= min;
            self.min_reserved[i] = u32::try_from(min).unwrap_or(0);
        }
    }

    /// Profile this config belongs to.
    pub const fn profile(&self) -> ConfigProfile {
        self.profile
    }

    /// Total concurrently running jobs allowed.
    pub const fn max_total(&self) -> u32 {
        self.max_total
    }

    /// Slots reserved for `work_type`. Zero for `None`.
    pub fn min_reserved(&self, work_type: WorkType) -> u32 {
        work_type.slot().map_or(0, |i| self.min_reserved[i])
    }

    /// Slots `work_type` may occupy at most. Zero for `None`.
    pub fn max_allowed(&self, work_type: WorkType) -> u32 {
        work_type.slot().map_or(0, |i| self.max_allowed[i])
    }
}

/// Quota configs for all eight profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkTypeConfigSet {
    configs: [WorkTypeConfig; 8],
}

impl Default for WorkTypeConfigSet {
    fn default() -> Self {
        use ConfigProfile as P;
        use WorkType::{Bg, BgUser, BgUserImportant, Ej, Fgs, Top};
        Self {
            configs: [
                WorkTypeConfig::new(
                    P::ScreenOnNormal,
                    16,
                    &[(Top, 4), (Fgs, 2), (Ej, 3), (Bg, 2), (BgUserImportant, 1), (BgUser, 1)],
                    &[(Bg, 8), (BgUserImportant, 3), (BgUser, 2)],
                ),
                WorkTypeConfig::new(
                    P::ScreenOnModerate,
                    14,
                    &[(Top, 4), (Fgs, 2), (Ej, 2), (Bg, 2), (BgUserImportant, 1)],
                    &[(Bg, 6), (BgUserImportant, 2), (BgUser, 1)],
                ),
                WorkTypeConfig::new(
                    P::ScreenOnLow,
                    10,
                    &[(Top, 4), (Fgs, 1), (Ej, 1), (Bg, 1)],
                    &[(Bg, 4), (BgUserImportant, 1), (BgUser, 1)],
                ),
                WorkTypeConfig::new(
                    P::ScreenOnCritical,
                    8,
                    &[(Top, 4), (Fgs, 1), (Ej, 1)],
                    &[(Bg, 1), (BgUserImportant, 1), (BgUser, 1)],
                ),
                WorkTypeConfig::new(
                    P::ScreenOffNormal,
                    16,
                    &[(Top, 4), (Fgs, 2), (Ej, 3), (Bg, 2), (BgUserImportant, 1), (BgUser, 1)],
                    &[(Bg, 10), (BgUserImportant, 3), (BgUser, 3)],
                ),
                WorkTypeConfig::new(
                    P::ScreenOffModerate,
                    16,
                    &[(Top, 4), (Fgs, 2), (Ej, 3), (Bg, 2), (BgUserImportant, 1)],
                    &[(Bg, 8), (BgUserImportant, 2), (BgUser, 2)],
                ),
                WorkTypeConfig::new(
                    P::ScreenOffLow,
                    12,
                    &[(Top, 4), (Fgs, 1), (Ej, 2), (Bg, 1), (BgUserImportant, 1)],
                    &[(Bg, 4), (BgUserImportant, 1), (BgUser, 1)],
                ),
                WorkTypeConfig::new(
                    P::ScreenOffCritical,
                    10,
                    &[(Top, 4), (Fgs, 1), (Ej, 2)],
                    &[(Bg, 2), (BgUserImportant, 1), (BgUser, 1)],
                ),
            ],
        }
    }
}

impl WorkTypeConfigSet {
    /// Built-in defaults for every profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for `profile`.
    pub const fn get(&self, profile: ConfigProfile) -> &WorkTypeConfig {
        &self.configs[profile.index()]
    }

    /// Re-derive every profile from `settings`.
    pub fn update(&mut self, settings: &DeviceSettings) {
        for config in &mut self.configs {
            config.update(settings);
        }
    }

    /// Iterate over all profiles' configs.
    pub fn iter(&self) -> impl Iterator<Item = &WorkTypeConfig> {
        self.configs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_respect_invariants() {
        for config in WorkTypeConfigSet::default().iter() {
            let total = config.max_total();
            assert!(total <= STANDARD_CONCURRENCY_LIMIT);
            let min_sum: u32 = WorkType::ALL.iter().map(|&wt| config.min_reserved(wt)).sum();
            assert!(min_sum <= total, "{}", config.profile());
            for wt in WorkType::ALL {
                assert!(config.max_allowed(wt) <= total);
                assert!(config.min_reserved(wt) <= config.max_allowed(wt));
            }
            assert!(config.min_reserved(WorkType::Top) >= 1);
        }
    }

    #[test]
    fn max_above_total_is_clamped() {
        let profile = ConfigProfile::ScreenOnNormal;
        let mut settings = DeviceSettings::new();
        settings
            .set_int(WorkTypeConfig::key_max_total(profile), 10)
            .set_int(WorkTypeConfig::key_max(WorkType::Bg, profile).unwrap(), 30);
        let mut set = WorkTypeConfigSet::default();
        set.update(&settings);
        let config = set.get(profile);
        assert_eq!(config.max_total(), 10);
        assert_eq!(config.max_allowed(WorkType::Bg), 10);
    }

    #[test]
    fn excess_minimums_are_reduced_without_starving_top() {
        let profile = ConfigProfile::ScreenOffLow;
        let mut settings = DeviceSettings::new();
        settings.set_int(WorkTypeConfig::key_max_total(profile), 4);
        for wt in WorkType::ALL {
            settings.set_int(WorkTypeConfig::key_min(wt, profile).unwrap(), 3);
        }
        let mut set = WorkTypeConfigSet::default();
        set.update(&settings);
        let config = set.get(profile);
        assert_eq!(config.min_reserved(WorkType::Top), 3);
        assert_eq!(config.min_reserved(WorkType::Fgs), 1);
        assert_eq!(config.min_reserved(WorkType::Ej), 0);
        assert_eq!(config.min_reserved(WorkType::BgUser), 0);
    }

    #[test]
    fn total_is_bounded_by_standard_limit() {
        let profile = ConfigProfile::ScreenOnLow;
        let mut settings = DeviceSettings::new();
        settings.set_int(WorkTypeConfig::key_max_total(profile), 100);
        let mut set = WorkTypeConfigSet::default();
        set.update(&settings);
        assert_eq!(set.get(profile).max_total(), STANDARD_CONCURRENCY_LIMIT);
    }

    #[test]
    fn malformed_key_uses_default() {
        let profile = ConfigProfile::ScreenOnNormal;
        let mut settings = DeviceSettings::new();
        settings.set(WorkTypeConfig::key_max_total(profile), "sixteen");
        let mut set = WorkTypeConfigSet::default();
        set.update(&settings);
        assert_eq!(set.get(profile).max_total(), 16);
    }

    #[test]
    fn none_has_no_key() {
        assert!(WorkTypeConfig::key_max(WorkType::None, ConfigProfile::ScreenOnNormal).is_err());
        assert_eq!(
            WorkTypeConfig::key_min(WorkType::BgUserImportant, ConfigProfile::ScreenOffCritical)
                .unwrap(),
            "min_bguser_important_screen_off_critical"
        );
    }
}
