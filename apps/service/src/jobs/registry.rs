use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::task::MonitorTask;
use crate::error::{JobError, JobResult};

/// Every job known to this process, keyed by id.
///
/// Lookups are owner-qualified: a task is only handed out to the owner it was
/// created for, and every per-job operation goes through [`get`](Self::get) or
/// [`remove`](Self::remove).
#[derive(Default)]
pub struct JobRegistry {
    tasks: RwLock<HashMap<i64, Arc<MonitorTask>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task; fails with `Conflict` if its id is already taken.
    pub async fn add(&self, task: Arc<MonitorTask>) -> JobResult<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.entry(task.id()) {
            Entry::Occupied(_) => {
                warn!(job_id = task.id(), "refusing to register duplicate job id");
                Err(JobError::Conflict(format!("job {} is already registered", task.id())))
            }
            Entry::Vacant(slot) => {
                debug!(job_id = task.id(), owner_id = task.owner_id(), "job registered");
                slot.insert(task);
                Ok(())
            }
        }
    }

    pub async fn get(&self, id: i64, owner_id: i64) -> JobResult<Arc<MonitorTask>> {
        self.tasks
            .read()
            .await
            .get(&id)
            .filter(|task| task.owner_id() == owner_id)
            .cloned()
            .ok_or(JobError::NotFound)
    }

    /// Deregister a task. The caller is responsible for stopping it.
    pub async fn remove(&self, id: i64, owner_id: i64) -> JobResult<Arc<MonitorTask>> {
        let mut tasks = self.tasks.write().await;
        match tasks.entry(id) {
            Entry::Occupied(entry) if entry.get().owner_id() == owner_id => {
                debug!(job_id = id, owner_id, "job deregistered");
                Ok(entry.remove())
            }
            _ => Err(JobError::NotFound),
        }
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Stop every running loop and wait for all of them to exit.
    ///
    /// Tasks stay registered; this is meant for process shutdown.
    pub async fn stop_all(&self) -> usize {
        let tasks: Vec<_> = self.tasks.read().await.values().cloned().collect();
        let handles: Vec<_> = tasks.iter().filter_map(|task| task.halt()).collect();
        let stopped = handles.len();

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("check loop ended abnormally: {}", e);
            }
        }

        info!(stopped, registered = tasks.len(), "all check loops stopped");
        stopped
    }
}
