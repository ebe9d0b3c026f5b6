//! Tests for audit sink

use std::sync::Arc;

use job_admission::builders::SchedulerBuilder;
use job_admission::core::{
    build_audit_event, AuditSink, InMemoryAuditSink, Job, JobQueue, WorkType,
};
use job_admission::util::serde::SlotId;
use parking_lot::Mutex;

fn job() -> Job {
    Job::new(10_001, 7, "com.example")
}

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    sink.record(build_audit_event(&job(), SlotId(3), WorkType::Bg, "start", None));

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].job, "10001/7");
    assert_eq!(events[0].slot, SlotId(3));
    assert_eq!(events[0].action, "start");
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    for action in ["start", "preempt", "complete"] {
        sink.record(build_audit_event(&job(), SlotId(0), WorkType::Bg, action, None));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].action, "preempt"); // First one popped
    assert_eq!(events[1].action, "complete");
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        &job(),
        SlotId(1),
        WorkType::Ej,
        "stop",
        Some("cancelled".to_string()),
    );

    assert_eq!(event.package, "com.example");
    assert_eq!(event.user_id, 0);
    assert_eq!(event.work_type, WorkType::Ej);
    assert_eq!(event.detail.as_deref(), Some("cancelled"));
    assert_eq!(event.event_id.len(), 36);
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_manager_records_decisions() {
    let sink = Arc::new(Mutex::new(InMemoryAuditSink::new(16)));
    let mut manager = SchedulerBuilder::default()
        .with_audit(Box::new(Arc::clone(&sink)))
        .build_manager()
        .unwrap();
    let job = Arc::new(job());
    manager.pending_mut().add(Arc::clone(&job));
    manager.assign_jobs_to_contexts();
    manager.on_job_completed(&job.key()).unwrap();

    let actions: Vec<_> = sink.lock().events().into_iter().map(|e| e.action).collect();
    assert_eq!(actions, vec!["start", "complete"]);
    assert_eq!(sink.lock().slot_history(SlotId(0)), vec!["start", "complete"]);
    assert!(sink.lock().slot_history(SlotId(1)).is_empty());
}
