//! Static scheduler options and per-package concurrency limits.

use serde::{Deserialize, Serialize};

use crate::config::{DeviceSettings, STANDARD_CONCURRENCY_LIMIT};

/// Settings key of the per-package expedited job limit.
pub const KEY_PKG_CONCURRENCY_LIMIT_EJ: &str = "pkg_concurrency_limit_ej";
/// Settings key of the per-package regular job limit.
pub const KEY_PKG_CONCURRENCY_LIMIT_REGULAR: &str = "pkg_concurrency_limit_regular";
/// Default per-package expedited job limit.
pub const DEFAULT_PKG_CONCURRENCY_LIMIT_EJ: u32 = 3;
/// Default per-package regular job limit.
pub const DEFAULT_PKG_CONCURRENCY_LIMIT_REGULAR: u32 = STANDARD_CONCURRENCY_LIMIT / 2;

const MAX_DELAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Options fixed for the lifetime of a scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Push jobs of background users into the `BGUSER*` buckets.
    pub restrict_background_users: bool,
    /// How long the previous foreground user keeps elevated standing after a switch.
    pub user_grace_period_ms: u64,
    /// How long the screen must stay off before the screen-off quotas apply.
    pub screen_off_adjustment_delay_ms: u64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            restrict_background_users: true,
            user_grace_period_ms: 60_000,
            screen_off_adjustment_delay_ms: 30_000,
        }
    }
}

impl ConcurrencyConfig {
    /// Validate option ranges.
    ///
    /// # Errors
    /// Returns a description of the first invalid option.
    pub fn validate(&self) -> Result<(), String> {
        if self.user_grace_period_ms > MAX_DELAY_MS {
            return Err("user_grace_period_ms must not exceed one day".into());
        }
        if self.screen_off_adjustment_delay_ms > MAX_DELAY_MS {
            return Err("screen_off_adjustment_delay_ms must not exceed one day".into());
        }
        Ok(())
    }

    /// Parse options from a JSON string and validate. Missing fields take defaults.
    ///
    /// # Errors
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// How many jobs of each urgency class one package may have running or staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageLimits {
    /// Expedited jobs.
    pub ej: u32,
    /// Regular jobs.
    pub regular: u32,
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self {
            ej: DEFAULT_PKG_CONCURRENCY_LIMIT_EJ,
            regular: DEFAULT_PKG_CONCURRENCY_LIMIT_REGULAR,
        }
    }
}

fn limit_from(settings: &DeviceSettings, key: &str, default: u32) -> u32 {
    let raw = settings.get_int(key, i64::from(default));
    let clamped = raw.clamp(1, i64::from(STANDARD_CONCURRENCY_LIMIT));
    if clamped != raw {
        tracing::warn!(key, raw, clamped, "package limit out of range; clamped");
    }
    u32::try_from(clamped).unwrap_or(default)
}

impl PackageLimits {
    /// Read both limits, clamped to `[1, STANDARD_CONCURRENCY_LIMIT]`.
    pub fn from_settings(settings: &DeviceSettings) -> Self {
        Self {
            ej: limit_from(
                settings,
                KEY_PKG_CONCURRENCY_LIMIT_EJ,
                DEFAULT_PKG_CONCURRENCY_LIMIT_EJ,
            ),
            regular: limit_from(
                settings,
                KEY_PKG_CONCURRENCY_LIMIT_REGULAR,
                DEFAULT_PKG_CONCURRENCY_LIMIT_REGULAR,
            ),
        }
    }

    /// Limit for one urgency class.
    pub const fn for_class(&self, expedited: bool) -> u32 {
        if expedited {
            self.ej
        } else {
            self.regular
        }
    }
}
