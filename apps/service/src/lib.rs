//! Datacat monitoring engine
//!
//! Jobs are persisted through [`database::JobStore`], kept in memory in a
//! [`jobs::JobRegistry`] and driven by one check loop each. The
//! [`orchestrator::Orchestrator`] is the surface the transports talk to.

pub mod config;
pub mod database;
pub mod error;
pub mod jobs;
pub mod monitoring;
pub mod orchestrator;
pub mod pool;
pub mod validation;

pub use error::{JobError, JobResult};
pub use orchestrator::{CreatedJob, NewJob, Orchestrator};
