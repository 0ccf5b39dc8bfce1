/// Orchestrator module - the job control surface
///
/// The orchestrator ties the job store, the in-memory registry and the probe
/// executor together. Every verb that names a job resolves it through the
/// registry's owner check (or the store's owner-qualified queries) before it
/// touches anything.

#[cfg(test)]
mod tests;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Config, Preferences};
use crate::database::{JobRecord, JobStore, LibsqlJobStore, initialize_database};
use crate::error::{JobError, JobResult};
use crate::jobs::{JobRegistry, MonitorTask};
use crate::monitoring::{JobStatus, MonitoringExecutor};
use crate::pool::open_pool;
use crate::validation::validate_new_job;

/// Payload of a creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub name: String,
    pub url: String,
    /// Seconds between probes
    pub frequency: u64,
}

/// What a successful creation reports back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedJob {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// Main orchestrator for the datacat service
pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    registry: JobRegistry,
    executor: Arc<MonitoringExecutor>,
    preferences: Preferences,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<MonitoringExecutor>,
        preferences: Preferences,
    ) -> Self {
        Self { store, registry: JobRegistry::new(), executor, preferences }
    }

    /// Open the configured database, migrate it, and bring persisted jobs back.
    pub async fn start(config: &Config) -> Result<Self> {
        let pool = open_pool(&config.database.path, config.database.max_connections).await?;

        info!("Initializing database schema...");
        let conn = pool.get().await?;
        initialize_database(&conn).await?;
        drop(conn);

        let store = Arc::new(LibsqlJobStore::new_from_pool(pool));
        let executor = Arc::new(MonitoringExecutor::new(
            config.preferences.probe_timeout(),
            config.preferences.degraded_threshold_ms,
        )?);

        let orchestrator = Self::new(store, executor, config.preferences.clone());
        let restored = orchestrator.restore().await?;
        info!("Orchestrator started with {} persisted jobs", restored);

        Ok(orchestrator)
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Register every persisted job and restart those flagged active.
    ///
    /// Only records come back; the last status of each job starts over as
    /// pending.
    pub async fn restore(&self) -> JobResult<usize> {
        let records = self.store.get_all_jobs().await?;
        let mut restored = 0;

        for record in records {
            if record.frequency_seconds == 0 {
                warn!(job_id = record.id, "skipping persisted job with zero frequency");
                continue;
            }

            let task = Arc::new(MonitorTask::from_record(&record, self.executor.clone()));
            if let Err(e) = self.registry.add(task.clone()).await {
                warn!(job_id = record.id, "skipping persisted job: {}", e);
                continue;
            }
            if record.active {
                task.run();
            }
            restored += 1;
        }

        Ok(restored)
    }

    /// Persist, register and start a new job.
    ///
    /// Nothing is built in memory unless the record was stored; if the job
    /// cannot be registered the stored record is removed again.
    pub async fn create(&self, owner_id: i64, job: NewJob) -> JobResult<CreatedJob> {
        let name = job.name.trim().to_string();
        let url = job.url.trim().to_string();
        validate_new_job(&name, &url, job.frequency, &self.preferences)?;

        let id = self.store.insert_job(&name, &url, job.frequency, owner_id).await?;

        let task = Arc::new(MonitorTask::new(
            id,
            owner_id,
            name.clone(),
            url.clone(),
            std::time::Duration::from_secs(job.frequency),
            self.executor.clone(),
        ));

        if let Err(e) = self.registry.add(task.clone()).await {
            error!(job_id = id, owner_id, "stored job could not be registered: {}", e);
            if let Err(cleanup) = self.store.delete_job(id, owner_id).await {
                error!(job_id = id, owner_id, "failed to remove orphaned job record: {}", cleanup);
            }
            return Err(e);
        }

        task.run();
        info!(job_id = id, owner_id, url = %url, frequency = job.frequency, "job created");

        Ok(CreatedJob { id, name, url })
    }

    /// The stored record, whether or not the job is running
    pub async fn get_one(&self, id: i64, owner_id: i64) -> JobResult<JobRecord> {
        self.store.get_job_by_id(id, owner_id).await?.ok_or(JobError::NotFound)
    }

    pub async fn get_all(&self, owner_id: i64) -> JobResult<Vec<JobRecord>> {
        Ok(self.store.get_all_jobs_by_user_id(owner_id).await?)
    }

    /// Resolve a job for a status session or any other direct use
    pub async fn task(&self, id: i64, owner_id: i64) -> JobResult<Arc<MonitorTask>> {
        self.registry.get(id, owner_id).await
    }

    pub async fn get_status(&self, id: i64, owner_id: i64) -> JobResult<JobStatus> {
        Ok(self.registry.get(id, owner_id).await?.status())
    }

    pub async fn get_active(&self, id: i64, owner_id: i64) -> JobResult<bool> {
        Ok(self.registry.get(id, owner_id).await?.is_active())
    }

    /// Stop a running job and record it as inactive.
    pub async fn pause(&self, id: i64, owner_id: i64) -> JobResult<()> {
        let task = self.registry.get(id, owner_id).await?;

        if !task.stop() {
            return Err(JobError::Conflict("Can not pause a job which is not active".into()));
        }

        self.store.update_job_active(false, id, owner_id).await?;
        info!(job_id = id, owner_id, "job paused");
        Ok(())
    }

    /// Start the job over; it is active afterwards whatever its prior state.
    pub async fn restart(&self, id: i64, owner_id: i64) -> JobResult<()> {
        let task = self.registry.get(id, owner_id).await?;

        let was_active = task.stop();
        if !task.run() && task.is_retired() {
            // Deleted between the lookup and the run
            return Err(JobError::NotFound);
        }

        self.store.update_job_active(true, id, owner_id).await?;
        info!(job_id = id, owner_id, was_active, "job restarted");
        Ok(())
    }

    /// Deregister and stop the job, then drop its record.
    pub async fn delete(&self, id: i64, owner_id: i64) -> JobResult<()> {
        let task = self.registry.remove(id, owner_id).await?;
        task.retire();

        if let Err(e) = self.store.delete_job(id, owner_id).await {
            error!(job_id = id, owner_id, "job removed from memory but its record remains: {}", e);
            return Err(e.into());
        }

        info!(job_id = id, owner_id, "job deleted");
        Ok(())
    }

    /// Stop every check loop; called once on the way out.
    pub async fn shutdown(&self) {
        let stopped = self.registry.stop_all().await;
        info!("Orchestrator stopped {} running jobs", stopped);
    }
}
