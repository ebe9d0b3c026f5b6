//! Runtime adapters and API surface.

pub mod api;
pub mod service;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

pub use api::{health, Health, JobSubmission, SchedulerSnapshot};
pub use service::JobScheduler;
#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;
