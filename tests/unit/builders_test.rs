//! Tests for builder modules

use std::sync::Arc;

use job_admission::builders::SchedulerBuilder;
use job_admission::config::{ConfigProfile, DeviceSettings, MemoryLevel};
use job_admission::core::{SchedulerError, UserDirectory};
use job_admission::infra::InMemoryUserDirectory;
use job_admission::util::{Clock, ManualClock};

#[test]
fn test_builder_defaults() {
    let manager = SchedulerBuilder::default().build_manager().unwrap();
    assert_eq!(manager.active_profile(), ConfigProfile::ScreenOnNormal);
    assert_eq!(manager.active_config().max_total(), 16);
    assert_eq!(manager.package_limits().ej, 3);
    assert_eq!(manager.running_count(), 0);
}

#[test]
fn test_builder_applies_settings_and_state() {
    let mut settings = DeviceSettings::new();
    settings
        .set_int("max_total_screen_on_moderate", 9)
        .set_int("pkg_concurrency_limit_regular", 4);
    let manager = SchedulerBuilder::default()
        .with_settings(settings)
        .with_memory_level(MemoryLevel::Moderate)
        .build_manager()
        .unwrap();
    assert_eq!(manager.active_profile(), ConfigProfile::ScreenOnModerate);
    assert_eq!(manager.active_config().max_total(), 9);
    assert_eq!(manager.package_limits().regular, 4);
}

#[test]
fn test_builder_screen_off_waits_for_delay() {
    let clock = Arc::new(ManualClock::new(0));
    let mut manager = SchedulerBuilder::from_json_str(r#"{"screen_off_adjustment_delay_ms": 100}"#)
        .unwrap()
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .with_interactive(false)
        .build_manager()
        .unwrap();
    assert_eq!(manager.active_profile(), ConfigProfile::ScreenOnNormal);
    clock.advance(100);
    manager.prepare_for_assignment_determination();
    assert_eq!(manager.active_profile(), ConfigProfile::ScreenOffNormal);
}

#[test]
fn test_builder_uses_given_directory() {
    let users = Arc::new(InMemoryUserDirectory::new(11));
    let manager = SchedulerBuilder::default()
        .with_users(Arc::clone(&users) as Arc<dyn UserDirectory>)
        .build_manager()
        .unwrap();
    assert_eq!(manager.grace_observer().current_user(), 11);
}

#[test]
fn test_builder_rejects_invalid_json() {
    assert!(matches!(
        SchedulerBuilder::from_json_str(r#"{"user_grace_period_ms": "soon"}"#),
        Err(SchedulerError::Config(_))
    ));
}
