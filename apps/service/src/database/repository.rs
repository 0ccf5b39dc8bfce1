use async_trait::async_trait;
use libsql::params;
use std::time::SystemTime;

use super::error::StoreError;
use super::models::JobRecord;
use crate::pool::{LibsqlManager, LibsqlPool};

const JOB_COLUMNS: &str =
    "id, user_id, name, url, frequency_seconds, active, created_at, updated_at";

/// Durable storage of job records.
///
/// Every per-job query is qualified by the owner id; a row that exists for a
/// different owner is reported exactly like a missing one.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new active job and return its id
    async fn insert_job(
        &self,
        name: &str,
        url: &str,
        frequency_seconds: u64,
        owner_id: i64,
    ) -> Result<i64, StoreError>;

    async fn get_job_by_id(&self, id: i64, owner_id: i64) -> Result<Option<JobRecord>, StoreError>;

    async fn get_all_jobs_by_user_id(&self, owner_id: i64) -> Result<Vec<JobRecord>, StoreError>;

    /// Every job of every owner, used to rebuild the registry at startup
    async fn get_all_jobs(&self) -> Result<Vec<JobRecord>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when no row matches
    async fn update_job_active(&self, active: bool, id: i64, owner_id: i64)
    -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] when no row matches
    async fn delete_job(&self, id: i64, owner_id: i64) -> Result<(), StoreError>;
}

/// LibSQL-backed job store
pub struct LibsqlJobStore {
    pool: LibsqlPool,
}

impl LibsqlJobStore {
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>, StoreError> {
        Ok(self.pool.get().await?)
    }

    async fn query_jobs(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<JobRecord>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(sql, params).await?;
        let mut jobs = Vec::new();

        while let Some(row) = rows.next().await? {
            jobs.push(row_to_record(&row)?);
        }

        Ok(jobs)
    }
}

fn row_to_record(row: &libsql::Row) -> Result<JobRecord, StoreError> {
    let frequency: i64 = row.get(4)?;
    let frequency_seconds = u64::try_from(frequency)
        .map_err(|_| StoreError::Corrupt(format!("negative frequency {frequency}")))?;
    let created_at: i64 = row.get(6)?;
    let updated_at: i64 = row.get(7)?;

    Ok(JobRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        url: row.get(3)?,
        frequency_seconds,
        active: row.get::<i64>(5)? != 0,
        created_at: JobRecord::i64_to_timestamp(created_at),
        updated_at: JobRecord::i64_to_timestamp(updated_at),
    })
}

#[async_trait]
impl JobStore for LibsqlJobStore {
    async fn insert_job(
        &self,
        name: &str,
        url: &str,
        frequency_seconds: u64,
        owner_id: i64,
    ) -> Result<i64, StoreError> {
        let frequency = i64::try_from(frequency_seconds)
            .map_err(|_| StoreError::Corrupt(format!("frequency {frequency_seconds} out of range")))?;
        let now = JobRecord::timestamp_to_i64(SystemTime::now());
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO jobs (user_id, name, url, frequency_seconds, active, created_at, updated_at) VALUES (?, ?, ?, ?, 1, ?, ?)",
            params![owner_id, name, url, frequency, now, now],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn get_job_by_id(&self, id: i64, owner_id: i64) -> Result<Option<JobRecord>, StoreError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ? AND user_id = ?");
        Ok(self.query_jobs(&sql, params![id, owner_id]).await?.into_iter().next())
    }

    async fn get_all_jobs_by_user_id(&self, owner_id: i64) -> Result<Vec<JobRecord>, StoreError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE user_id = ? ORDER BY id");
        self.query_jobs(&sql, params![owner_id]).await
    }

    async fn get_all_jobs(&self) -> Result<Vec<JobRecord>, StoreError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY id");
        self.query_jobs(&sql, ()).await
    }

    async fn update_job_active(
        &self,
        active: bool,
        id: i64,
        owner_id: i64,
    ) -> Result<(), StoreError> {
        let now = JobRecord::timestamp_to_i64(SystemTime::now());
        let conn = self.get_conn().await?;

        let changed = conn
            .execute(
                "UPDATE jobs SET active = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                params![if active { 1 } else { 0 }, now, id, owner_id],
            )
            .await?;

        if changed == 0 { Err(StoreError::NotFound) } else { Ok(()) }
    }

    async fn delete_job(&self, id: i64, owner_id: i64) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;

        let changed = conn
            .execute("DELETE FROM jobs WHERE id = ? AND user_id = ?", params![id, owner_id])
            .await?;

        if changed == 0 { Err(StoreError::NotFound) } else { Ok(()) }
    }
}
