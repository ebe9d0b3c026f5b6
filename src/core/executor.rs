//! Execution-context seam.

use async_trait::async_trait;

use crate::core::ContextAssignment;

/// Applies assignment changes to the execution contexts that actually run jobs.
///
/// Called after the scheduler lock has been released, once per changed slot.
/// Implementations stop `old_job` and/or start `new_job` as
/// [`ContextAssignment::kind`] dictates.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use job_admission::core::{AssignmentKind, ContextAssignment, SlotExecutor};
///
/// #[derive(Clone)]
/// struct ServiceContexts;
///
/// #[async_trait]
/// impl SlotExecutor for ServiceContexts {
///     async fn apply(&self, change: ContextAssignment) {
///         match change.kind() {
///             AssignmentKind::Start => bind_service(change.slot, change.new_job).await,
///             AssignmentKind::Stop => unbind_service(change.slot).await,
///             AssignmentKind::Replace => {
///                 unbind_service(change.slot).await;
///                 bind_service(change.slot, change.new_job).await;
///             }
///             AssignmentKind::Keep => {}
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait SlotExecutor: Send + Sync + Clone + 'static {
    /// Apply one slot transition.
    async fn apply(&self, change: ContextAssignment);
}

/// Abstraction for spawning slot changes on a runtime.
pub trait Spawn {
    /// Spawn a fire-and-forget future.
    fn spawn<F>(&self, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static;
}
