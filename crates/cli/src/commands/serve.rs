//! Long-running HTTP trigger server.

use anyhow::Result;
use clap::Args;

use trade_desk_core::AppConfig;
use trade_desk_web_api::ApiServer;

use super::Runtime;

/// Arguments for the serve command.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen address (defaults to server.host:server.port from config)
    #[arg(short, long)]
    pub addr: Option<String>,
}

/// Serves trigger endpoints until SIGINT or SIGTERM.
///
/// # Errors
/// Returns an error if setup fails, the trigger secret is unset, or the
/// listener cannot bind.
pub async fn run_serve(config: AppConfig, args: ServeArgs) -> Result<()> {
    if config.trigger.secret.is_empty() {
        anyhow::bail!("trigger.secret must be set to serve trigger endpoints");
    }

    let addr = args.addr.unwrap_or_else(|| config.server.addr());
    let runtime = Runtime::connect(config).await?;
    let server = ApiServer::new(runtime.desk.clone(), runtime.config.trigger.clone());

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve(&addr).await {
            tracing::error!("Server error: {}", e);
        }
    });

    shutdown_signal().await?;

    server_handle.abort();
    runtime.shutdown().await;
    tracing::info!("Trade desk stopped");
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
    }
    Ok(())
}
