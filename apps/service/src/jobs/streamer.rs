use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::task::MonitorTask;
use crate::monitoring::JobStatus;

/// One client connection as seen by a status session.
#[async_trait]
pub trait StatusChannel: Send {
    /// Wait for the client's next ping. The payload is irrelevant.
    ///
    /// `Ok(false)` means the client closed the connection.
    async fn next_ping(&mut self) -> Result<bool>;

    async fn send_status(&mut self, status: &JobStatus) -> Result<()>;
}

/// What a finished session did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub updates_sent: u64,
}

/// Answers client pings with the job's latest status, at most once per
/// job frequency.
pub struct StatusStreamer {
    task: Arc<MonitorTask>,
}

impl StatusStreamer {
    pub fn new(task: Arc<MonitorTask>) -> Self {
        Self { task }
    }

    /// Serve one client until it disconnects or the channel fails.
    pub async fn serve<C: StatusChannel + ?Sized>(&self, channel: &mut C) -> SessionSummary {
        let job_id = self.task.id();
        let mut updates_sent = 0;

        loop {
            match channel.next_ping().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(job_id, "status client disconnected");
                    break;
                }
                Err(e) => {
                    debug!(job_id, error = %e, "status client read failed");
                    break;
                }
            }

            if let Err(e) = channel.send_status(&self.task.status()).await {
                debug!(job_id, error = %e, "status push failed");
                break;
            }
            updates_sent += 1;

            // Pings arriving meanwhile queue up on the transport
            tokio::time::sleep(self.task.frequency()).await;
        }

        info!(job_id, updates_sent, "status session ended");
        SessionSummary { updates_sent }
    }
}
