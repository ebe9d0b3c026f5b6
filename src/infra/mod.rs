//! Infrastructure adapters: pending queue, slot mailbox and user directory.

pub mod mailbox;
pub mod queue;
pub mod users;

pub use mailbox::{AssignmentMailbox, SlotMessage};
pub use queue::PendingJobQueue;
pub use users::InMemoryUserDirectory;
