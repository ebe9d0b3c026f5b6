//! Work-type buckets and the pure job classification function.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::{Job, SchedulerError, BIAS_FOREGROUND_SERVICE, BIAS_TOP_APP};

/// Number of real (non-`None`) work types.
pub const NUM_WORK_TYPES: usize = 6;

/// Scheduling bucket driving quota policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    /// No bucket; used for empty slots and failed admission.
    None,
    /// The app on top of the foreground user.
    Top,
    /// Apps running a foreground service.
    Fgs,
    /// Expedited jobs of foreground users.
    Ej,
    /// Regular background work of foreground users.
    Bg,
    /// Background users' important work (grace period, FGS bias or expedited).
    BgUserImportant,
    /// Everything else from background users.
    BgUser,
}

bitflags! {
    /// Set of work types a job may run as.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WorkTypes: u8 {
        /// [`WorkType::Top`]
        const TOP = 1 << 0;
        /// [`WorkType::Fgs`]
        const FGS = 1 << 1;
        /// [`WorkType::Ej`]
        const EJ = 1 << 2;
        /// [`WorkType::Bg`]
        const BG = 1 << 3;
        /// [`WorkType::BgUserImportant`]
        const BGUSER_IMPORTANT = 1 << 4;
        /// [`WorkType::BgUser`]
        const BGUSER = 1 << 5;
    }
}

impl WorkType {
    /// Real work types in preference order.
    pub const ALL: [Self; NUM_WORK_TYPES] = [
        Self::Top,
        Self::Fgs,
        Self::Ej,
        Self::Bg,
        Self::BgUserImportant,
        Self::BgUser,
    ];

    /// Single-member mask. `None` maps to the empty set.
    pub const fn mask(self) -> WorkTypes {
        match self {
            Self::None => WorkTypes::empty(),
            Self::Top => WorkTypes::TOP,
            Self::Fgs => WorkTypes::FGS,
            Self::Ej => WorkTypes::EJ,
            Self::Bg => WorkTypes::BG,
            Self::BgUserImportant => WorkTypes::BGUSER_IMPORTANT,
            Self::BgUser => WorkTypes::BGUSER,
        }
    }

    pub(crate) const fn slot(self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Top => Some(0),
            Self::Fgs => Some(1),
            Self::Ej => Some(2),
            Self::Bg => Some(3),
            Self::BgUserImportant => Some(4),
            Self::BgUser => Some(5),
        }
    }

    /// Array index of a real work type.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidWorkType`] for `None`.
    pub fn index(self) -> Result<usize, SchedulerError> {
        self.slot()
            .ok_or_else(|| SchedulerError::InvalidWorkType(self.to_string()))
    }

    /// Name used in settings keys, `None` has none.
    pub const fn config_name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Top => Some("top"),
            Self::Fgs => Some("fgs"),
            Self::Ej => Some("ej"),
            Self::Bg => Some("bg"),
            Self::BgUserImportant => Some("bguser_important"),
            Self::BgUser => Some("bguser"),
        }
    }

    /// Parse a settings-key name.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidWorkType`] for anything but the six real names.
    pub fn from_config_name(name: &str) -> Result<Self, SchedulerError> {
        Self::ALL
            .into_iter()
            .find(|wt| wt.config_name() == Some(name))
            .ok_or_else(|| SchedulerError::InvalidWorkType(name.to_string()))
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "NONE",
            Self::Top => "TOP",
            Self::Fgs => "FGS",
            Self::Ej => "EJ",
            Self::Bg => "BG",
            Self::BgUserImportant => "BGUSER_IMPORTANT",
            Self::BgUser => "BGUSER",
        };
        f.write_str(s)
    }
}

impl WorkTypes {
    /// Members in preference order.
    pub fn types(self) -> impl Iterator<Item = WorkType> {
        WorkType::ALL
            .into_iter()
            .filter(move |wt| self.contains(wt.mask()))
    }

    /// Most preferred member, or `None` for the empty set.
    pub fn first(self) -> WorkType {
        self.types().next().unwrap_or(WorkType::None)
    }

    /// Whether `work_type` is a member.
    pub const fn has(self, work_type: WorkType) -> bool {
        !work_type.mask().is_empty() && self.contains(work_type.mask())
    }
}

/// How the scheduler regards the user a job runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStanding {
    /// Current user, a profile of it, or the primary user.
    Foreground,
    /// Previous foreground user still inside its post-switch window.
    GracePeriod,
    /// Any other user.
    Background,
}

/// Work types `job` may run as, given the standing of its source user.
pub fn classify(job: &Job, standing: UserStanding) -> WorkTypes {
    let mut types = WorkTypes::empty();
    match standing {
        UserStanding::Foreground => {
            if job.bias() >= BIAS_TOP_APP {
                types |= WorkTypes::TOP;
            } else if job.bias() >= BIAS_FOREGROUND_SERVICE {
                types |= WorkTypes::FGS;
            } else {
                types |= WorkTypes::BG;
            }
            if job.is_expedited() {
                types |= WorkTypes::EJ;
            }
        }
        UserStanding::GracePeriod => {
            types |= WorkTypes::BGUSER_IMPORTANT | WorkTypes::BGUSER;
        }
        UserStanding::Background => {
            if job.bias() >= BIAS_FOREGROUND_SERVICE || job.is_expedited() {
                types |= WorkTypes::BGUSER_IMPORTANT;
            }
            // Important jobs may still fall back to the plain bucket.
            types |= WorkTypes::BGUSER;
        }
    }
    types
}
