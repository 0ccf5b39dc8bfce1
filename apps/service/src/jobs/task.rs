use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::database::JobRecord;
use crate::monitoring::{JobStatus, MonitoringExecutor};

/// Handle of a running check loop
struct RunningLoop {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct RunControl {
    /// Bumped by every run and every stop; a loop may only publish while its
    /// own generation is current.
    generation: u64,
    running: Option<RunningLoop>,
    /// Set once the job is deleted; a retired task never runs again.
    retired: bool,
}

/// One monitored target and its check loop.
///
/// Identity and schedule are fixed at construction. The loop is the only
/// writer of the status; `run`/`stop` are the only writers of the run state.
/// Both live behind locks private to this task.
pub struct MonitorTask {
    id: i64,
    owner_id: i64,
    name: String,
    target_url: String,
    frequency: Duration,
    executor: Arc<MonitoringExecutor>,
    control: Mutex<RunControl>,
    status: RwLock<JobStatus>,
}

impl MonitorTask {
    pub fn new(
        id: i64,
        owner_id: i64,
        name: impl Into<String>,
        target_url: impl Into<String>,
        frequency: Duration,
        executor: Arc<MonitoringExecutor>,
    ) -> Self {
        Self {
            id,
            owner_id,
            name: name.into(),
            target_url: target_url.into(),
            frequency,
            executor,
            control: Mutex::new(RunControl::default()),
            status: RwLock::new(JobStatus::pending()),
        }
    }

    pub fn from_record(record: &JobRecord, executor: Arc<MonitoringExecutor>) -> Self {
        Self::new(
            record.id,
            record.owner_id,
            record.name.clone(),
            record.url.clone(),
            record.frequency(),
            executor,
        )
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    /// Snapshot of the most recent probe result
    pub fn status(&self) -> JobStatus {
        self.status.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_active(&self) -> bool {
        self.control().running.is_some()
    }

    pub fn is_retired(&self) -> bool {
        self.control().retired
    }

    /// Start the check loop unless one is already running.
    ///
    /// Returns `false`, and spawns nothing, when the task is already active or
    /// has been retired. Must be called from within a Tokio runtime.
    pub fn run(self: &Arc<Self>) -> bool {
        let mut control = self.control();
        if control.retired {
            debug!(job_id = self.id, "run ignored, job is retired");
            return false;
        }
        if control.running.is_some() {
            debug!(job_id = self.id, "run ignored, check loop already active");
            return false;
        }

        control.generation += 1;
        let generation = control.generation;
        let (stop_tx, stop_rx) = oneshot::channel();

        let handle = tokio::spawn(check_loop(
            Arc::downgrade(self),
            self.executor.clone(),
            self.target_url.clone(),
            self.frequency,
            generation,
            stop_rx,
        ));
        control.running = Some(RunningLoop { stop_tx, handle });

        info!(job_id = self.id, owner_id = self.owner_id, generation, "check loop started");
        true
    }

    /// Ask the check loop to exit.
    ///
    /// Returns as soon as the signal is delivered. The loop exits at its next
    /// suspension point (an in-flight probe is dropped) and never publishes
    /// again. Safe to call repeatedly and concurrently; only the call that
    /// actually stopped a running loop returns `true`.
    pub fn stop(&self) -> bool {
        // Dropping the join handle detaches the loop; the signal still ends it.
        self.halt().is_some()
    }

    /// Stop the loop for good. Later `run` calls are refused, so no holder of
    /// this task can bring the loop back once its job is gone.
    pub fn retire(&self) -> bool {
        self.control().retired = true;
        self.stop()
    }

    /// Like [`stop`](Self::stop), but hands back the loop's join handle so the
    /// caller can wait for the exit.
    pub(crate) fn halt(&self) -> Option<JoinHandle<()>> {
        let running = {
            let mut control = self.control();
            let running = control.running.take();
            if running.is_some() {
                control.generation += 1;
            }
            running
        };

        let RunningLoop { stop_tx, handle } = running?;
        if stop_tx.send(()).is_err() {
            debug!(job_id = self.id, "check loop already gone when stop was signalled");
        }
        info!(job_id = self.id, owner_id = self.owner_id, "check loop stopped");
        Some(handle)
    }

    /// Replace the status if `generation` is still the current run.
    fn publish(&self, generation: u64, status: JobStatus) -> bool {
        let control = self.control();
        if control.generation != generation {
            return false;
        }

        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
        true
    }

    fn control(&self) -> MutexGuard<'_, RunControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MonitorTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorTask")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("name", &self.name)
            .field("target_url", &self.target_url)
            .field("frequency", &self.frequency)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Probe, publish, sleep; until stopped.
///
/// The loop only holds a weak reference to its task, so it also ends once the
/// task itself is dropped (the stop sender goes with it).
async fn check_loop(
    task: Weak<MonitorTask>,
    executor: Arc<MonitoringExecutor>,
    target_url: String,
    frequency: Duration,
    generation: u64,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        let status = tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            status = executor.execute_check(&target_url, frequency) => status,
        };

        let Some(task) = task.upgrade() else { break };
        debug!(job_id = task.id, state = %status.state, latency_ms = ?status.latency_ms, "probe finished");
        if !task.publish(generation, status) {
            break;
        }
        drop(task);

        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = tokio::time::sleep(frequency) => {}
        }
    }

    debug!(generation, target = %target_url, "check loop exited");
}
