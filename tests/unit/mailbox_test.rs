//! Tests for the slot mailbox

use std::sync::Arc;

use job_admission::core::{
    AssignmentKind, ContextAssignment, Job, RunningJob, SlotExecutor, WorkType,
};
use job_admission::infra::AssignmentMailbox;
use job_admission::util::serde::SlotId;

fn running(job_id: i32) -> RunningJob {
    RunningJob {
        job: Arc::new(Job::new(10_001, job_id, "com.example")),
        work_type: WorkType::Bg,
        started_at_ms: 0,
    }
}

fn start(slot: usize, job_id: i32) -> ContextAssignment {
    let mut change = ContextAssignment::idle(SlotId(slot));
    change.new_job = Some(running(job_id).job);
    change.new_work_type = WorkType::Bg;
    change
}

#[test]
fn test_mailbox_deliver_and_fetch() {
    let mailbox = AssignmentMailbox::new();
    mailbox.deliver(&start(0, 1));
    mailbox.deliver(&start(1, 2));

    let messages = mailbox.fetch(SlotId(0), None, 10);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, AssignmentKind::Start);
    assert_eq!(messages[0].started.unwrap().job_id, 1);
    assert!(mailbox.fetch(SlotId(5), None, 10).is_empty());
    assert_eq!(mailbox.len(), 2);
}

#[test]
fn test_mailbox_replace_then_stop() {
    let mailbox = AssignmentMailbox::new();
    let old = running(1);
    let mut replace = ContextAssignment::occupied(SlotId(2), &old, Some("blocking EJ queue".into()));
    replace.new_job = Some(running(2).job);
    replace.preempt_reason = replace.stop_reason.clone();
    mailbox.deliver(&replace);
    assert_eq!(mailbox.started_jobs().len(), 1);

    let mut stop = ContextAssignment::occupied(SlotId(2), &running(2), None);
    stop.new_job = None;
    mailbox.deliver(&stop);

    let messages = mailbox.fetch(SlotId(2), None, 1);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, AssignmentKind::Replace);
    assert_eq!(messages[0].stopped.unwrap().job_id, 1);
    assert_eq!(messages[0].reason.as_deref(), Some("blocking EJ queue"));
    assert!(mailbox.started_jobs().is_empty());
}

#[test]
fn test_keep_assignment_is_recorded_as_keep() {
    let occupant = running(1);
    let keep = ContextAssignment::occupied(SlotId(0), &occupant, None);
    assert_eq!(keep.kind(), AssignmentKind::Keep);
}

#[tokio::test]
async fn test_mailbox_as_executor_shares_storage() {
    let mailbox = AssignmentMailbox::new();
    let handle = mailbox.clone();
    mailbox.apply(start(3, 9)).await;
    assert_eq!(handle.fetch(SlotId(3), Some(0), 10).len(), 1);
}
