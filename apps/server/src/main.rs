#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use datacat_service::Orchestrator;
use datacat_service::config::Config;
use tokio::net::TcpListener;
use tracing::{debug, info};

mod error;
mod owner;
mod routes;
mod ws;

use error::ServerError;
use logger::init_tracing;

/// Datacat job monitoring server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file; defaults to `DATACAT_CONFIG` at build
    /// time, then the XDG config directory
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<(), ServerError> {
    init_tracing();
    let args = Args::parse();

    let config_path = args.config.or_else(|| option_env!("DATACAT_CONFIG").map(PathBuf::from));
    let config = Config::from_config(config_path)?;
    debug!("{}", config);

    let orchestrator = Arc::new(Orchestrator::start(&config).await.map_err(ServerError::Startup)?);

    let ws_addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.ws_port).parse()?;
    let listener = TcpListener::bind(ws_addr).await?;
    info!(%ws_addr, "status stream listening");
    let streams = tokio::spawn(ws::serve(listener, orchestrator.clone()));

    let http_addr: SocketAddr =
        format!("{}:{}", config.server.bind, config.server.http_port).parse()?;
    let result = run_server(http_addr, orchestrator.clone()).await;

    streams.abort();
    orchestrator.shutdown().await;
    result
}

async fn run_server(addr: SocketAddr, orchestrator: Arc<Orchestrator>) -> Result<(), ServerError> {
    let data = web::Data::from(orchestrator);

    info!(%addr, "http server listening");
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(routes::json_config())
            .configure(routes::routes)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
