//! In-memory mailbox recording slot changes handed to the execution layer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{AssignmentKind, ContextAssignment, JobKey, SlotExecutor, WorkType};
use crate::util::serde::SlotId;

/// Mailbox message container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMessage {
    /// What happened to the slot.
    pub kind: AssignmentKind,
    /// Job that left the slot.
    pub stopped: Option<JobKey>,
    /// Job that entered the slot.
    pub started: Option<JobKey>,
    /// Bucket of the started job.
    pub work_type: WorkType,
    /// Stop or preemption reason.
    pub reason: Option<String>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl From<&ContextAssignment> for SlotMessage {
    fn from(change: &ContextAssignment) -> Self {
        let kind = change.kind();
        Self {
            kind,
            stopped: match kind {
                AssignmentKind::Stop | AssignmentKind::Replace => {
                    change.old_job.as_ref().map(|j| j.key())
                }
                _ => None,
            },
            started: match kind {
                AssignmentKind::Start | AssignmentKind::Replace => {
                    change.new_job.as_ref().map(|j| j.key())
                }
                _ => None,
            },
            work_type: change.new_work_type,
            reason: change.preempt_reason.clone(),
            created_at_ms: crate::util::clock::now_ms(),
        }
    }
}

/// Slot executor that only records what it was asked to do, per slot.
///
/// Cloning shares the underlying storage, so a test can keep one handle and
/// give another to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct AssignmentMailbox {
    messages: Arc<Mutex<HashMap<SlotId, Vec<SlotMessage>>>>,
}

impl AssignmentMailbox {
    /// Create a new mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one change.
    pub fn deliver(&self, change: &ContextAssignment) {
        self.messages
            .lock()
            .entry(change.slot)
            .or_default()
            .push(SlotMessage::from(change));
    }

    /// Fetch messages for a slot, optionally since a timestamp.
    pub fn fetch(&self, slot: SlotId, since_ms: Option<u128>, limit: usize) -> Vec<SlotMessage> {
        self.messages
            .lock()
            .get(&slot)
            .map(|msgs| {
                msgs.iter()
                    .filter(|m| since_ms.is_none_or(|s| m.created_at_ms >= s))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total messages across all slots.
    pub fn len(&self) -> usize {
        self.messages.lock().values().map(Vec::len).sum()
    }

    /// Whether nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs currently started and not since stopped, according to the log.
    pub fn started_jobs(&self) -> Vec<JobKey> {
        let messages = self.messages.lock();
        let mut slots: Vec<_> = messages.keys().copied().collect();
        slots.sort();
        slots
            .into_iter()
            .filter_map(|slot| messages.get(&slot)?.last()?.started)
            .collect()
    }
}

#[async_trait]
impl SlotExecutor for AssignmentMailbox {
    async fn apply(&self, change: ContextAssignment) {
        tracing::debug!(slot = %change.slot, kind = ?change.kind(), "slot change");
        self.deliver(&change);
    }
}
