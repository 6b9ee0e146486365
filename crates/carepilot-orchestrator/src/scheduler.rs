use crate::config::SchedulerConfig;
use crate::service::Orchestrator;
use carepilot_core::{CarePilotError, CarePilotResult};
use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Background driver for periodic drains and the durable-retry sweep.
#[derive(Debug, Clone)]
pub struct Scheduler {
    drain: Option<Schedule>,
    retry_sweep: Duration,
}

impl Scheduler {
    pub fn new(config: &SchedulerConfig) -> CarePilotResult<Self> {
        let drain = config.drain_cron.as_deref().map(Self::parse_cron).transpose()?;
        Ok(Self {
            drain,
            retry_sweep: Duration::from_secs(config.retry_sweep_secs.max(1)),
        })
    }

    /// Parse a cron expression string into a [`cron::Schedule`].
    ///
    /// Uses the 7-field cron format: sec min hour day-of-month month day-of-week year.
    pub fn parse_cron(cron_expr: &str) -> CarePilotResult<Schedule> {
        Schedule::from_str(cron_expr).map_err(|e| {
            CarePilotError::Config(format!("Invalid cron expression '{cron_expr}': {e}"))
        })
    }

    fn until_next_drain(&self) -> Option<Duration> {
        let next = self.drain.as_ref()?.upcoming(Utc).next()?;
        Some((next - Utc::now()).to_std().unwrap_or_default())
    }

    /// Spawn the scheduler loop.
    ///
    /// The loop ends as soon as the orchestrator begins shutting down; the
    /// returned handle can also be aborted directly.
    pub fn start(self, orchestrator: Arc<Orchestrator>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(self.retry_sweep);
            sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let drain_wait = self.until_next_drain();
                tokio::select! {
                    () = orchestrator.closed() => break,
                    _ = sweep.tick() => {
                        match orchestrator.resume_due_retries().await {
                            Ok(_) => {}
                            Err(CarePilotError::Shutdown) => break,
                            Err(e) => tracing::warn!(error = %e, "Scheduler: retry sweep failed"),
                        }
                    }
                    _ = sleep_or_never(drain_wait) => {
                        tracing::info!("Scheduler: draining queued tasks");
                        match orchestrator.process_pending_tasks().await {
                            Ok(count) => tracing::debug!(count, "Scheduler: drain dispatched"),
                            Err(CarePilotError::Shutdown) => break,
                            Err(e) => tracing::warn!(error = %e, "Scheduler: drain failed"),
                        }
                    }
                }
            }
            tracing::info!("Scheduler: stopped");
        })
    }
}

async fn sleep_or_never(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_cron() {
        assert!(Scheduler::parse_cron("0 */5 * * * * *").is_ok());
    }

    #[test]
    fn test_parse_invalid_cron() {
        let err = Scheduler::parse_cron("every five minutes").unwrap_err();
        assert!(matches!(err, CarePilotError::Config(_)));
    }

    #[test]
    fn test_new_rejects_bad_drain_cron() {
        let config = SchedulerConfig {
            drain_cron: Some("nope".into()),
            retry_sweep_secs: 5,
        };
        assert!(Scheduler::new(&config).is_err());
    }

    #[test]
    fn test_no_drain_without_cron() {
        let scheduler = Scheduler::new(&SchedulerConfig::default()).unwrap();
        assert!(scheduler.until_next_drain().is_none());
        assert_eq!(scheduler.retry_sweep, Duration::from_secs(5));
    }
}
