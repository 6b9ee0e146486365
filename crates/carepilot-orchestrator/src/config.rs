use carepilot_core::DEFAULT_MAX_RETRIES;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime knobs for the orchestrator: pool size, retry policy and call timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of concurrent workers draining the job queue.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Bound on queued jobs; submitters wait when it is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Retry n waits `backoff_base_secs * 2^n` seconds.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Upper bound for every provider and executor call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Fail the attempt on unparseable decisions instead of degrading them.
    #[serde(default)]
    pub strict_decisions: bool,
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_backoff_base_secs() -> u64 {
    1
}

fn default_call_timeout_secs() -> u64 {
    60
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            strict_decisions: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }
}

/// Background scheduling: periodic drains and the durable-retry sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 7-field cron expression (sec min hour dom month dow year) for draining queued tasks.
    #[serde(default)]
    pub drain_cron: Option<String>,
    #[serde(default = "default_retry_sweep_secs")]
    pub retry_sweep_secs: u64,
}

fn default_retry_sweep_secs() -> u64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            drain_cron: None,
            retry_sweep_secs: default_retry_sweep_secs(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_table() {
        let config: OrchestratorConfig = toml::from_str("").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.call_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_override() {
        let config: OrchestratorConfig =
            toml::from_str("workers = 1\nstrict_decisions = true").unwrap();
        assert_eq!(config.workers, 1);
        assert!(config.strict_decisions);
        assert_eq!(config.queue_capacity, 256);

        let scheduler: SchedulerConfig =
            toml::from_str("drain_cron = \"0 */5 * * * * *\"").unwrap();
        assert_eq!(scheduler.retry_sweep_secs, 5);
    }
}
