//! Task orchestration and multi-agent collaboration for CarePilot.
//!
//! Tasks are created, dispatched to a bounded worker pool and retried with
//! exponential backoff until they complete or exhaust their retry budget.
//! Collaborations run agents one after another over a shared transcript and
//! end in a synthesized decision scored with success metrics.
//!
//! # Main types
//!
//! - [`Orchestrator`]: Service facade; owns the worker pool and both stores.
//! - [`TaskEngine`]: Task lifecycle, priority drains and the retry policy.
//! - [`CollaborationCoordinator`]: Plan, exchange and synthesis of sessions.
//! - [`AgentMonitor`]: Per-agent-type counters and status.
//! - [`Scheduler`]: Cron drains and the durable-retry sweep.

/// Collaboration planning and background exchange.
pub mod collaboration;
/// Orchestrator and scheduler configuration.
pub mod config;
/// Task lifecycle and retry handling.
pub mod engine;
/// Per-key async locks.
pub mod lock;
/// Collaboration success metrics.
pub mod metrics;
/// Agent health and metrics monitoring.
pub mod monitor;
/// Bounded job queue and worker pool.
pub mod pool;
/// Exponential backoff policy.
pub mod retry;
/// Cron-based drains and retry sweep.
pub mod scheduler;
/// Orchestrator service facade.
pub mod service;

pub use collaboration::CollaborationCoordinator;
pub use config::{OrchestratorConfig, SchedulerConfig};
pub use engine::TaskEngine;
pub use metrics::compute_success_metrics;
pub use monitor::{AgentMetrics, AgentMonitor, AgentState, WorkerStatus};
pub use pool::{Dispatcher, Job, JobHandler, WorkerPool};
pub use retry::RetryPolicy;
pub use scheduler::Scheduler;
pub use service::Orchestrator;
