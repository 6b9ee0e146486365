//! Core types and error definitions for the CarePilot orchestration engine.
//!
//! This crate provides the data model shared by every CarePilot crate: tasks
//! and their state machine, decisions, collaboration sessions, and the unified
//! error taxonomy.
//!
//! # Main types
//!
//! - [`CarePilotError`]: Unified error enum for all CarePilot subsystems.
//! - [`CarePilotResult`]: Convenience alias for `Result<T, CarePilotError>`.
//! - [`AgentType`] / [`Priority`]: Fixed enumerations selecting workflow and urgency.
//! - [`Task`]: A unit of agent work with bounded retries.
//! - [`Decision`]: Typed decision payload produced by a provider.
//! - [`CollaborationSession`]: A sequential multi-agent exchange.

/// Agent type and priority enumerations.
pub mod agent;
/// Collaboration session, transcript and metrics types.
pub mod collaboration;
/// Typed decision payloads.
pub mod decision;
/// Error taxonomy.
pub mod error;
/// Task record and state machine.
pub mod task;

pub use agent::{AgentType, Priority};
pub use collaboration::{
    agent_id, CollaborationMessage, CollaborationSession, MessageType, SessionStatus,
    SuccessMetrics,
};
pub use decision::{Decision, MANUAL_REVIEW_ACTION};
pub use error::{CarePilotError, CarePilotResult};
pub use task::{ErrorDetails, FailureKind, StatusChange, Task, TaskStatus, DEFAULT_MAX_RETRIES};
