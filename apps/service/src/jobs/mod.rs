//! In-memory job engine: per-job check loops, the owner-scoped registry that
//! holds them, and live status sessions.

pub mod registry;
pub mod streamer;
pub mod task;

pub use registry::JobRegistry;
pub use streamer::{SessionSummary, StatusChannel, StatusStreamer};
pub use task::MonitorTask;
