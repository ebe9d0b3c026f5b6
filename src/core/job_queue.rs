//! Pending-queue abstraction consumed by the concurrency manager.

use std::sync::Arc;

use crate::core::{Job, JobKey};

/// Ordered holder of jobs waiting for an execution slot.
///
/// Traversal order is descending bias, then enqueue order. Callers hold the
/// scheduler lock; no operation blocks.
pub trait JobQueue: Send {
    /// Insert or refresh `job`. Returns `false` if a job with the same key was
    /// already queued; it keeps its enqueue position within its bias.
    fn add(&mut self, job: Arc<Job>) -> bool;

    /// Remove a queued job.
    fn remove(&mut self, key: &JobKey) -> Option<Arc<Job>>;

    /// Whether a job with `key` is queued.
    fn contains(&self, key: &JobKey) -> bool;

    /// Drop every queued job.
    fn clear(&mut self);

    /// Queued job count.
    fn len(&self) -> usize;

    /// Whether nothing is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs in traversal order.
    fn snapshot(&self) -> Vec<Arc<Job>>;
}
