//! Queue backends.

pub mod pending;

pub use pending::PendingJobQueue;
