use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::checker::{Checker, HttpChecker};
use super::types::JobStatus;

/// Runs single probes and turns their outcome into a [`JobStatus`].
///
/// Every probe is bounded by a timeout, so a hanging target shows up as a
/// `down` status instead of stalling the caller.
pub struct MonitoringExecutor {
    checker: Arc<dyn Checker>,
    timeout: Duration,
    degraded_threshold_ms: u64,
}

impl MonitoringExecutor {
    /// Executor backed by the HTTP checker
    pub fn new(timeout: Duration, degraded_threshold_ms: u64) -> Result<Self> {
        let checker = Arc::new(HttpChecker::new(timeout)?);
        Ok(Self::with_checker(checker, timeout, degraded_threshold_ms))
    }

    pub fn with_checker(
        checker: Arc<dyn Checker>,
        timeout: Duration,
        degraded_threshold_ms: u64,
    ) -> Self {
        Self { checker, timeout, degraded_threshold_ms }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `target` once, giving up after `budget` (capped at the configured timeout).
    pub async fn execute_check(&self, target: &str, budget: Duration) -> JobStatus {
        let budget = budget.min(self.timeout);

        match timeout(budget, self.checker.check(target)).await {
            Ok(Ok((latency_ms, status_code))) => {
                if latency_ms > self.degraded_threshold_ms {
                    JobStatus::degraded(latency_ms, status_code)
                } else {
                    JobStatus::success(latency_ms, status_code)
                }
            }
            Ok(Err(e)) => JobStatus::failure(e.to_string(), None),
            Err(_) => JobStatus::failure(format!("probe timed out after {}ms", budget.as_millis()), None),
        }
    }
}
