/// Tests for the job control surface
///
/// These run the orchestrator against a real libsql file in a temp dir and a
/// scripted checker, so no probe ever leaves the process.
use crate::config::Preferences;
use crate::database::{JobRecord, JobStore, LibsqlJobStore, StoreError, initialize_database};
use crate::error::JobError;
use crate::monitoring::testing::{CountingChecker, executor_for};
use crate::orchestrator::{NewJob, Orchestrator};
use crate::pool::open_pool;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

/// Helper to create a migrated store in a fresh temp dir
async fn create_test_store() -> Result<(Arc<LibsqlJobStore>, TempDir)> {
    let temp_dir = tempdir()?;
    let pool = open_pool(temp_dir.path().join("test.db"), 4).await?;

    let conn = pool.get().await?;
    initialize_database(&conn).await?;
    drop(conn);

    Ok((Arc::new(LibsqlJobStore::new_from_pool(pool)), temp_dir))
}

fn orchestrator_with(store: Arc<dyn JobStore>, checker: &Arc<CountingChecker>) -> Orchestrator {
    let preferences = Preferences { allow_private_targets: true, ..Preferences::default() };
    Orchestrator::new(store, executor_for(checker.clone()), preferences)
}

fn site() -> NewJob {
    NewJob { name: "site".into(), url: "http://example.test".into(), frequency: 1 }
}

#[tokio::test]
async fn test_create_then_observe() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let checker = Arc::new(CountingChecker::default());
    let orchestrator = orchestrator_with(store, &checker);

    let created = orchestrator.create(7, site()).await?;
    assert_eq!(created.name, "site");
    assert_eq!(created.url, "http://example.test");

    assert!(orchestrator.get_active(created.id, 7).await?);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let status = orchestrator.get_status(created.id, 7).await?;
    assert!(!status.is_pending());
    assert_eq!(status.status_code, Some(200));

    let record = orchestrator.get_one(created.id, 7).await?;
    assert_eq!(record.owner_id, 7);
    assert_eq!(record.frequency_seconds, 1);
    assert!(record.active);

    orchestrator.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_other_owner_sees_nothing() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let checker = Arc::new(CountingChecker::default());
    let orchestrator = orchestrator_with(store, &checker);

    let id = orchestrator.create(7, site()).await?.id;

    assert!(matches!(orchestrator.get_one(id, 8).await, Err(JobError::NotFound)));
    assert!(matches!(orchestrator.get_status(id, 8).await, Err(JobError::NotFound)));
    assert!(matches!(orchestrator.get_active(id, 8).await, Err(JobError::NotFound)));
    assert!(matches!(orchestrator.pause(id, 8).await, Err(JobError::NotFound)));
    assert!(matches!(orchestrator.restart(id, 8).await, Err(JobError::NotFound)));
    assert!(matches!(orchestrator.delete(id, 8).await, Err(JobError::NotFound)));
    assert!(orchestrator.get_all(8).await?.is_empty());

    // Owner 7 is unaffected by the attempts above
    assert!(orchestrator.get_active(id, 7).await?);
    assert_eq!(orchestrator.get_all(7).await?.len(), 1);

    orchestrator.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_pause_and_restart() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let checker = Arc::new(CountingChecker::default());
    let orchestrator = orchestrator_with(store, &checker);
    let id = orchestrator.create(7, site()).await?.id;
    tokio::time::sleep(Duration::from_millis(50)).await;

    orchestrator.pause(id, 7).await?;
    assert!(!orchestrator.get_active(id, 7).await?);
    assert!(!orchestrator.get_one(id, 7).await?.active);

    let frozen = orchestrator.get_status(id, 7).await?;
    let calls = checker.calls();
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(checker.calls(), calls);
    assert_eq!(orchestrator.get_status(id, 7).await?, frozen);

    assert!(matches!(orchestrator.pause(id, 7).await, Err(JobError::Conflict(_))));

    orchestrator.restart(id, 7).await?;
    assert!(orchestrator.get_active(id, 7).await?);
    assert!(orchestrator.get_one(id, 7).await?.active);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(checker.calls() > calls);

    // Restarting a running job keeps exactly one loop
    let task = orchestrator.task(id, 7).await?;
    orchestrator.restart(id, 7).await?;
    assert!(task.is_active());
    assert!(!task.run());

    orchestrator.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_delete_stops_and_forgets() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let checker = Arc::new(CountingChecker::default());
    let orchestrator = orchestrator_with(store.clone(), &checker);
    let id = orchestrator.create(7, site()).await?.id;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let task = orchestrator.task(id, 7).await?;
    orchestrator.delete(id, 7).await?;
    assert!(!task.is_active());

    assert!(matches!(orchestrator.get_one(id, 7).await, Err(JobError::NotFound)));
    assert!(matches!(orchestrator.get_status(id, 7).await, Err(JobError::NotFound)));
    assert!(matches!(orchestrator.delete(id, 7).await, Err(JobError::NotFound)));
    assert!(store.get_job_by_id(id, 7).await?.is_none());

    let status = task.status();
    let calls = checker.calls();
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(checker.calls(), calls);
    assert_eq!(task.status(), status);
    Ok(())
}

#[tokio::test]
async fn test_deleted_job_cannot_be_run_again() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let checker = Arc::new(CountingChecker::default());
    let orchestrator = orchestrator_with(store, &checker);
    let id = orchestrator.create(7, site()).await?.id;

    // A handle taken before the delete, as a live status session holds one
    let held = orchestrator.task(id, 7).await?;
    orchestrator.delete(id, 7).await?;
    let calls = checker.calls();

    held.stop();
    assert!(!held.run());
    assert!(!held.is_active());
    assert!(matches!(orchestrator.restart(id, 7).await, Err(JobError::NotFound)));

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(checker.calls(), calls);
    Ok(())
}

#[tokio::test]
async fn test_pause_mid_probe_then_restart() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let checker = Arc::new(CountingChecker::with_delay(Duration::from_millis(500)));
    let orchestrator = orchestrator_with(store, &checker);
    let id = orchestrator.create(7, site()).await?.id;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(checker.calls(), 1);
    orchestrator.pause(id, 7).await?;
    assert!(orchestrator.get_status(id, 7).await?.is_pending());

    orchestrator.restart(id, 7).await?;
    assert!(orchestrator.get_active(id, 7).await?);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(!orchestrator.get_status(id, 7).await?.is_pending());
    assert_eq!(checker.calls(), 2);
    assert_eq!(checker.max_in_flight(), 1);

    orchestrator.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_invalid_jobs_are_rejected_before_storage() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let checker = Arc::new(CountingChecker::default());
    let orchestrator = orchestrator_with(store.clone(), &checker);

    let bad = [
        NewJob { name: "".into(), ..site() },
        NewJob { url: "ftp://example.test".into(), ..site() },
        NewJob { url: "not a url".into(), ..site() },
        NewJob { frequency: 0, ..site() },
        NewJob { frequency: 86401, ..site() },
    ];
    for job in bad {
        assert!(matches!(orchestrator.create(7, job).await, Err(JobError::Validation(_))));
    }

    assert!(orchestrator.registry().is_empty().await);
    assert!(store.get_all_jobs().await?.is_empty());
    assert_eq!(checker.calls(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_ids() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let checker = Arc::new(CountingChecker::default());
    let orchestrator = Arc::new(orchestrator_with(store, &checker));

    let creators: Vec<_> = (1..=8)
        .map(|owner| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let job = NewJob { name: format!("owner-{owner}"), ..site() };
                orchestrator.create(owner, job).await.map(|created| (owner, created.id))
            })
        })
        .collect();

    let mut ids = Vec::new();
    for creator in creators {
        let (owner, id) = creator.await??;
        assert!(orchestrator.get_active(id, owner).await?);
        ids.push(id);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(orchestrator.registry().len().await, 8);

    orchestrator.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_restore_brings_back_active_jobs_only() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let running = store.insert_job("running", "http://example.test", 1, 7).await?;
    let paused = store.insert_job("paused", "http://example.test", 1, 7).await?;
    store.update_job_active(false, paused, 7).await?;

    let checker = Arc::new(CountingChecker::default());
    let orchestrator = orchestrator_with(store, &checker);
    assert_eq!(orchestrator.restore().await?, 2);

    assert!(orchestrator.get_active(running, 7).await?);
    assert!(!orchestrator.get_active(paused, 7).await?);
    assert!(orchestrator.get_status(paused, 7).await?.is_pending());

    // A second restore finds everything already registered
    assert_eq!(orchestrator.restore().await?, 0);

    orchestrator.shutdown().await;
    Ok(())
}

/// A store whose every write fails
struct BrokenStore;

#[async_trait]
impl JobStore for BrokenStore {
    async fn insert_job(&self, _: &str, _: &str, _: u64, _: i64) -> Result<i64, StoreError> {
        Err(StoreError::Pool("database unavailable".into()))
    }

    async fn get_job_by_id(&self, _: i64, _: i64) -> Result<Option<JobRecord>, StoreError> {
        Ok(None)
    }

    async fn get_all_jobs_by_user_id(&self, _: i64) -> Result<Vec<JobRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn get_all_jobs(&self) -> Result<Vec<JobRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn update_job_active(&self, _: bool, _: i64, _: i64) -> Result<(), StoreError> {
        Err(StoreError::Pool("database unavailable".into()))
    }

    async fn delete_job(&self, _: i64, _: i64) -> Result<(), StoreError> {
        Err(StoreError::Pool("database unavailable".into()))
    }
}

#[tokio::test]
async fn test_failed_insert_builds_nothing() -> Result<()> {
    let checker = Arc::new(CountingChecker::default());
    let orchestrator = orchestrator_with(Arc::new(BrokenStore), &checker);

    let result = orchestrator.create(7, site()).await;
    assert!(matches!(result, Err(JobError::Persistence(_))));
    assert!(orchestrator.registry().is_empty().await);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(checker.calls(), 0);
    Ok(())
}
