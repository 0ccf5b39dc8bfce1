//! Scripted checker for exercising job loops without touching the network.

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::checker::Checker;
use super::executor::MonitoringExecutor;

#[derive(Default)]
pub(crate) struct CountingChecker {
    delay: Duration,
    calls: AtomicU64,
    in_flight: Arc<AtomicU64>,
    max_in_flight: AtomicU64,
}

struct InFlight(Arc<AtomicU64>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CountingChecker {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }

    pub(crate) fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> u64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Checker for CountingChecker {
    async fn check(&self, _target: &str) -> Result<(u64, Option<u16>)> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(self.in_flight.clone());

        tokio::time::sleep(self.delay).await;
        Ok((call, Some(200)))
    }
}

pub(crate) fn executor_for(checker: Arc<CountingChecker>) -> Arc<MonitoringExecutor> {
    Arc::new(MonitoringExecutor::with_checker(checker, Duration::from_secs(30), 10_000))
}
