//! Persistence seams for CarePilot tasks and collaboration sessions.
//!
//! Both stores come as a trait plus an in-memory and a JSON-file
//! implementation. The orchestrator only ever talks to the traits.

/// Collaboration session store trait and implementations.
pub mod collaboration_store;
mod json_dir;
/// Task store trait and implementations.
pub mod task_store;

pub use collaboration_store::{
    CollaborationStore, FileCollaborationStore, InMemoryCollaborationStore,
};
pub use task_store::{FileTaskStore, InMemoryTaskStore, TaskStore};
