/// Job persistence
///
/// [`JobStore`] is the interface the engine needs from durable storage;
/// [`LibsqlJobStore`] implements it on a local libsql database.
pub mod error;
pub mod migrations;
pub mod models;
pub mod repository;

pub use error::StoreError;
pub use models::JobRecord;
pub use repository::{JobStore, LibsqlJobStore};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
