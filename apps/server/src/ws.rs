//! Live status over WebSocket
//!
//! Clients connect to `/jobs/{id}/stream` with the `X-User-Id` header and
//! receive the job's status as JSON each time they ping, no more often than
//! the job's frequency.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use datacat_service::Orchestrator;
use datacat_service::jobs::{StatusChannel, StatusStreamer};
use datacat_service::monitoring::JobStatus;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, warn};

use crate::owner::{OWNER_HEADER, Owner};

/// Accept status clients until the listener fails or the task is aborted.
pub async fn serve(listener: TcpListener, orchestrator: Arc<Orchestrator>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("failed to accept status client: {}", e);
                continue;
            }
        };

        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, orchestrator).await {
                debug!(%peer, "status session failed: {:#}", e);
            }
        });
    }
}

/// Job id and owner named by the handshake
fn parse_target(request: &Request) -> Result<(i64, Owner)> {
    let id = request
        .uri()
        .path()
        .strip_prefix("/jobs/")
        .and_then(|rest| rest.strip_suffix("/stream"))
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| anyhow!("expected /jobs/{{id}}/stream, got {}", request.uri().path()))?;

    let header = request.headers().get(OWNER_HEADER).and_then(|v| v.to_str().ok());
    let owner = Owner::parse(header)?;

    Ok((id, owner))
}

async fn handle_connection(stream: TcpStream, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let mut target = None;
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        target = Some(parse_target(request));
        Ok(response)
    };
    let mut socket = tokio_tungstenite::accept_hdr_async(stream, callback).await?;

    let resolved = match target {
        Some(Ok((id, owner))) => orchestrator.task(id, owner.0).await.map_err(anyhow::Error::from),
        Some(Err(e)) => Err(e),
        None => Err(anyhow!("handshake finished without a request")),
    };

    let task = match resolved {
        Ok(task) => task,
        Err(e) => {
            debug!("refusing status session: {:#}", e);
            let frame = CloseFrame { code: CloseCode::Policy, reason: e.to_string().into() };
            socket.close(Some(frame)).await?;
            return Ok(());
        }
    };

    info!(job_id = task.id(), owner_id = task.owner_id(), "status session opened");
    let mut channel = WsChannel { socket };
    StatusStreamer::new(task).serve(&mut channel).await;
    Ok(())
}

struct WsChannel {
    socket: WebSocketStream<TcpStream>,
}

#[async_trait]
impl StatusChannel for WsChannel {
    async fn next_ping(&mut self) -> Result<bool> {
        while let Some(message) = self.socket.next().await {
            match message? {
                Message::Text(_) | Message::Binary(_) => return Ok(true),
                Message::Close(_) => return Ok(false),
                // Control frames are answered by tungstenite itself
                _ => {}
            }
        }
        Ok(false)
    }

    async fn send_status(&mut self, status: &JobStatus) -> Result<()> {
        let payload = serde_json::to_string(status)?;
        self.socket.send(Message::text(payload)).await?;
        Ok(())
    }
}
