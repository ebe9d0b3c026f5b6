//! Tests for utility functions

use job_admission::util::{
    app_id_of, init_tracing, uid_for, user_id_of, Clock, ManualClock, SlotId, UserPackage, PER_USER_RANGE,
};

#[test]
fn test_uid_user_split() {
    let uid = uid_for(11, 10_042);
    assert_eq!(uid, 11 * PER_USER_RANGE + 10_042);
    assert_eq!(user_id_of(uid), 11);
    assert_eq!(app_id_of(uid), 10_042);
}

#[test]
fn test_user_package_display() {
    let key = UserPackage::new(10, "com.example");
    assert_eq!(key.to_string(), "<10>com.example");
    assert_eq!(key, UserPackage::new(10, "com.example".to_string()));
}

#[test]
fn test_slot_id() {
    assert_eq!(SlotId(4).to_string(), "slot#4");
    assert!(SlotId(1) < SlotId(2));
}

#[test]
fn test_manual_clock() {
    let clock = ManualClock::new(0);
    clock.advance(1_500);
    assert_eq!(clock.now_ms(), 1_500);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing installed");
}
