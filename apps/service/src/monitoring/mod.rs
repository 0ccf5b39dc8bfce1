/// Probe execution
///
/// A [`Checker`] performs the network call, the [`MonitoringExecutor`] bounds it
/// with a timeout and classifies the outcome into a [`JobStatus`].
pub mod checker;
pub mod executor;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use checker::{Checker, HttpChecker};
pub use executor::MonitoringExecutor;
pub use types::{JobStatus, MonitorStatus};
