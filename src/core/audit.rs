//! Audit trail of scheduling decisions.

use std::collections::VecDeque;

use uuid::Uuid;

use crate::core::work_type::WorkType;
use crate::core::Job;
use crate::util::clock::now_ms;
use crate::util::serde::SlotId;

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Job identity (`uid/job_id`).
    pub job: String,
    /// Slot involved.
    pub slot: SlotId,
    /// Source package.
    pub package: String,
    /// Source user.
    pub user_id: i32,
    /// Bucket the job ran or will run under.
    pub work_type: WorkType,
    /// Action taken (start, preempt, stop, complete).
    pub action: String,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context, such as a stop reason.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Actions recorded for `slot`, oldest first.
    pub fn slot_history(&self, slot: SlotId) -> Vec<String> {
        self.events
            .iter()
            .filter(|e| e.slot == slot)
            .map(|e| e.action.clone())
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build an audit event for `job` on `slot`.
pub fn build_audit_event(
    job: &Job,
    slot: SlotId,
    work_type: WorkType,
    action: impl Into<String>,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: Uuid::new_v4().to_string(),
        job: job.key().to_string(),
        slot,
        package: job.source_package().to_string(),
        user_id: job.source_user_id(),
        work_type,
        action: action.into(),
        created_at_ms: now_ms(),
        detail,
    }
}

impl<S: AuditSink> AuditSink for std::sync::Arc<parking_lot::Mutex<S>> {
    fn record(&mut self, event: AuditEvent) {
        self.lock().record(event);
    }
}
