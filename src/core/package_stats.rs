//! Per-package running/staged job counters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::util::serde::UserPackage;

/// Running and staged job counts for one `(user, package)`, split by urgency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStats {
    /// Regular jobs currently running.
    pub num_running_regular: u32,
    /// Expedited jobs currently running.
    pub num_running_ej: u32,
    /// Regular jobs staged in the current pass.
    pub num_staged_regular: u32,
    /// Expedited jobs staged in the current pass.
    pub num_staged_ej: u32,
}

fn adjust(count: &mut u32, add: bool, what: &str) {
    if add {
        *count += 1;
    } else if *count == 0 {
        tracing::error!("{what} count would go negative; ignoring decrement");
    } else {
        *count -= 1;
    }
}

impl PackageStats {
    /// Increment or decrement the running count for the given urgency class.
    pub fn adjust_running_count(&mut self, add: bool, expedited: bool) {
        if expedited {
            adjust(&mut self.num_running_ej, add, "running EJ");
        } else {
            adjust(&mut self.num_running_regular, add, "running regular");
        }
    }

    /// Increment or decrement the staged count for the given urgency class.
    pub fn adjust_staged_count(&mut self, add: bool, expedited: bool) {
        if expedited {
            adjust(&mut self.num_staged_ej, add, "staged EJ");
        } else {
            adjust(&mut self.num_staged_regular, add, "staged regular");
        }
    }

    /// Running plus staged jobs of one urgency class.
    pub const fn committed(&self, expedited: bool) -> u32 {
        if expedited {
            self.num_running_ej + self.num_staged_ej
        } else {
            self.num_running_regular + self.num_staged_regular
        }
    }

    /// Drop staged counts at the end of a pass.
    pub const fn reset_staged_count(&mut self) {
        self.num_staged_regular = 0;
        self.num_staged_ej = 0;
    }

    /// All four counters are zero.
    pub const fn is_empty(&self) -> bool {
        self.num_running_regular == 0
            && self.num_running_ej == 0
            && self.num_staged_regular == 0
            && self.num_staged_ej == 0
    }
}

/// Table of [`PackageStats`] for packages with running or staged work.
#[derive(Debug, Default)]
pub struct PackageStatsTable {
    stats: HashMap<UserPackage, PackageStats>,
}

impl PackageStatsTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats for a package, if it has an entry.
    pub fn get(&self, key: &UserPackage) -> Option<&PackageStats> {
        self.stats.get(key)
    }

    /// Stats for a package, creating a zeroed entry if needed.
    pub fn get_or_create(&mut self, key: &UserPackage) -> &mut PackageStats {
        self.stats.entry(key.clone()).or_default()
    }

    /// Remove the entry for `key` if every counter is zero.
    pub fn remove_if_empty(&mut self, key: &UserPackage) {
        if self.stats.get(key).is_some_and(PackageStats::is_empty) {
            self.stats.remove(key);
        }
    }

    /// Clear staged counts everywhere and drop entries left empty.
    pub fn end_pass(&mut self) {
        self.stats.retain(|_, s| {
            s.reset_staged_count();
            !s.is_empty()
        });
    }

    /// Number of tracked packages.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// No package has running or staged work.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&UserPackage, &PackageStats)> {
        self.stats.iter()
    }
}
