//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A work type lookup was given `NONE` or an unknown name.
    #[error("invalid work type: {0}")]
    InvalidWorkType(String),
    /// Every execution slot is occupied.
    #[error("no idle slot available")]
    NoIdleSlot,
    /// The job already occupies a slot.
    #[error("job {0} is already running")]
    AlreadyRunning(String),
    /// The job does not occupy any slot.
    #[error("job {0} is not running")]
    NotRunning(String),
    /// Configuration could not be parsed or failed validation.
    #[error("config error: {0}")]
    Config(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
