//! Engine timing configuration.

use crate::error::{MqueueError, MqueueResult};
use std::time::Duration;

/// Timings and limits for the delivery engine.
///
/// The defaults reproduce the reference behavior: poll every second, retry a
/// transient failure every second, sweep processed rows hourly, and wait up to
/// ten seconds for in-flight deliveries on shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Interval between poller ticks.
    pub poll_interval: Duration,
    /// Fixed pause between attempts after a transient failure.
    pub retry_interval: Duration,
    /// Interval between janitor sweeps.
    pub janitor_interval: Duration,
    /// Upper bound on how long `stop()` waits for in-flight deliveries.
    pub drain_timeout: Duration,
    /// How often `stop()` re-checks the in-flight count while draining.
    pub drain_check_interval: Duration,
    /// Cap on simultaneously running delivery workers. `None` is unbounded.
    pub max_concurrent_deliveries: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            retry_interval: Duration::from_secs(1),
            janitor_interval: Duration::from_secs(60 * 60),
            drain_timeout: Duration::from_secs(10),
            drain_check_interval: Duration::from_secs(1),
            max_concurrent_deliveries: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `MQUEUE_*` environment variables.
    ///
    /// - `MQUEUE_POLL_INTERVAL_MS`
    /// - `MQUEUE_RETRY_INTERVAL_MS`
    /// - `MQUEUE_JANITOR_INTERVAL_SECS`
    /// - `MQUEUE_DRAIN_TIMEOUT_SECS`
    /// - `MQUEUE_MAX_CONCURRENT_DELIVERIES` (0 means unbounded)
    ///
    /// Unparsable values, and zero for any interval, are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let interval = |key: &str| number(key).filter(|&n| n > 0);
        let mut config = Self::default();

        if let Some(ms) = interval("MQUEUE_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = interval("MQUEUE_RETRY_INTERVAL_MS") {
            config.retry_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = interval("MQUEUE_JANITOR_INTERVAL_SECS") {
            config.janitor_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = number("MQUEUE_DRAIN_TIMEOUT_SECS") {
            config.drain_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = number("MQUEUE_MAX_CONCURRENT_DELIVERIES") {
            config.max_concurrent_deliveries = (max > 0).then_some(max as usize);
        }

        config
    }

    /// Reject intervals the timers cannot run with.
    pub fn validate(&self) -> MqueueResult<()> {
        let intervals = [
            ("poll_interval", self.poll_interval),
            ("retry_interval", self.retry_interval),
            ("janitor_interval", self.janitor_interval),
            ("drain_check_interval", self.drain_check_interval),
        ];
        match intervals.iter().find(|(_, d)| d.is_zero()) {
            Some((name, _)) => Err(MqueueError::InvalidConfig(format!("{name} must be non-zero"))),
            None => Ok(()),
        }
    }
}
