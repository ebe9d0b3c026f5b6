//! In-memory pending queue ordered by bias, FIFO within a bias.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::core::{Job, JobKey, JobQueue};

/// Sort key: higher bias first, earlier enqueue first within a bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueOrder {
    bias: i32,
    seq: u64,
}

impl PartialOrd for QueueOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.bias.cmp(&self.bias) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
    }
}

/// Pending jobs keyed by [`JobKey`], traversed in scheduling order.
///
/// O(log n) insertion and removal; re-adding a queued job whose bias changed
/// repositions it while keeping its original enqueue sequence.
#[derive(Debug, Default)]
pub struct PendingJobQueue {
    jobs: BTreeMap<QueueOrder, Arc<Job>>,
    index: HashMap<JobKey, QueueOrder>,
    next_seq: u64,
}

impl PendingJobQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrowing traversal in scheduling order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Job>> {
        self.jobs.values()
    }

    /// Highest-priority queued job.
    pub fn peek(&self) -> Option<&Arc<Job>> {
        self.jobs.values().next()
    }
}

impl JobQueue for PendingJobQueue {
    fn add(&mut self, job: Arc<Job>) -> bool {
        let key = job.key();
        if let Some(existing) = self.index.get(&key).copied() {
            self.jobs.remove(&existing);
            let order = QueueOrder {
                bias: job.bias(),
                seq: existing.seq,
            };
            self.jobs.insert(order, job);
            self.index.insert(key, order);
            return false;
        }
        let order = QueueOrder {
            bias: job.bias(),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.jobs.insert(order, job);
        self.index.insert(key, order);
        true
    }

    fn remove(&mut self, key: &JobKey) -> Option<Arc<Job>> {
        let order = self.index.remove(key)?;
        self.jobs.remove(&order)
    }

    fn contains(&self, key: &JobKey) -> bool {
        self.index.contains_key(key)
    }

    fn clear(&mut self) {
        self.jobs.clear();
        self.index.clear();
    }

    fn len(&self) -> usize {
        self.jobs.len()
    }

    fn snapshot(&self) -> Vec<Arc<Job>> {
        self.jobs.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BIAS_DEFAULT, BIAS_FOREGROUND_SERVICE, BIAS_TOP_APP};

    fn job(job_id: i32, bias: i32) -> Arc<Job> {
        Arc::new(Job::new(10_001, job_id, "com.example").with_bias(bias))
    }

    fn ids(q: &PendingJobQueue) -> Vec<i32> {
        q.iter().map(|j| j.key().job_id).collect()
    }

    #[test]
    fn test_bias_ordering() {
        let mut q = PendingJobQueue::new();
        q.add(job(1, BIAS_DEFAULT));
        q.add(job(2, BIAS_TOP_APP));
        q.add(job(3, BIAS_FOREGROUND_SERVICE));
        assert_eq!(ids(&q), vec![2, 3, 1]);
        assert_eq!(q.peek().unwrap().key().job_id, 2);
    }

    #[test]
    fn test_fifo_within_bias() {
        let mut q = PendingJobQueue::new();
        for id in [5, 3, 9] {
            q.add(job(id, BIAS_DEFAULT));
        }
        assert_eq!(ids(&q), vec![5, 3, 9]);
    }

    #[test]
    fn test_duplicate_add_is_safe() {
        let mut q = PendingJobQueue::new();
        assert!(q.add(job(1, BIAS_DEFAULT)));
        assert!(q.add(job(2, BIAS_DEFAULT)));
        assert!(!q.add(job(1, BIAS_DEFAULT)));
        assert_eq!(q.len(), 2);
        assert_eq!(ids(&q), vec![1, 2]);
    }

    #[test]
    fn test_readd_with_new_bias_repositions() {
        let mut q = PendingJobQueue::new();
        q.add(job(1, BIAS_DEFAULT));
        q.add(job(2, BIAS_DEFAULT));
        q.add(job(2, BIAS_TOP_APP));
        assert_eq!(ids(&q), vec![2, 1]);
        assert_eq!(q.snapshot()[0].bias(), BIAS_TOP_APP);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut q = PendingJobQueue::new();
        q.add(job(1, BIAS_DEFAULT));
        q.add(job(2, BIAS_DEFAULT));
        let key = JobKey {
            uid: 10_001,
            job_id: 1,
        };
        assert!(q.contains(&key));
        assert_eq!(q.remove(&key).unwrap().key(), key);
        assert!(q.remove(&key).is_none());
        q.clear();
        assert!(q.is_empty());
    }
}
