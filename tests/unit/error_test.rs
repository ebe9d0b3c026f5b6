//! Tests for error types

use job_admission::core::{SchedulerError, WorkType};

#[test]
fn test_invalid_work_type_error() {
    let err = WorkType::None.index().unwrap_err();
    assert_eq!(format!("{}", err), "invalid work type: NONE");
}

#[test]
fn test_no_idle_slot_error() {
    let err = SchedulerError::NoIdleSlot;
    assert_eq!(format!("{}", err), "no idle slot available");
}

#[test]
fn test_running_state_errors() {
    assert_eq!(
        SchedulerError::AlreadyRunning("10001/1".into()).to_string(),
        "job 10001/1 is already running"
    );
    assert_eq!(
        SchedulerError::NotRunning("10001/1".into()).to_string(),
        "job 10001/1 is not running"
    );
}

#[test]
fn test_config_error_into_anyhow() {
    let err: anyhow::Error = SchedulerError::Config("bad".to_string()).into();
    assert_eq!(format!("{}", err), "config error: bad");
}
