//! One-shot purchase, catch-up and retry commands.
//!
//! Each prints the run result as JSON on stdout.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use trade_desk_core::AppConfig;
use trade_desk_execution::{ExecutionError, RunOutcome};

use super::Runtime;

/// Arguments for the catch-up command.
#[derive(Args, Debug, Clone)]
pub struct CatchUpArgs {
    /// Report to purchase (defaults to the latest report)
    #[arg(long)]
    pub report_id: Option<i64>,
}

/// Arguments for the retry command.
#[derive(Args, Debug, Clone)]
pub struct RetryArgs {
    /// Run outside the configured weekly window
    #[arg(long)]
    pub force: bool,
}

/// Runs the primary purchase for the latest report.
///
/// # Errors
/// Returns an error if setup fails or the run aborts.
pub async fn run_purchase(config: AppConfig) -> Result<()> {
    let runtime = Runtime::connect(config).await?;
    let result = runtime.desk.purchase().await;
    runtime.shutdown().await;
    report(result)
}

/// Runs the catch-up purchase.
///
/// # Errors
/// Returns an error if setup fails or the run aborts.
pub async fn run_catch_up(config: AppConfig, args: CatchUpArgs) -> Result<()> {
    let runtime = Runtime::connect(config).await?;
    let result = runtime.desk.catch_up(args.report_id).await;
    runtime.shutdown().await;
    report(result)
}

/// Retries pending spreads.
///
/// # Errors
/// Returns an error if setup fails or the batch aborts.
pub async fn run_retry(config: AppConfig, args: RetryArgs) -> Result<()> {
    let runtime = Runtime::connect(config).await?;
    let result = runtime.desk.retry_spreads(args.force).await;
    runtime.shutdown().await;
    report(result)
}

fn report<T: Serialize>(result: Result<RunOutcome<T>, ExecutionError>) -> Result<()> {
    let outcome = result?;
    if let RunOutcome::Skipped { reason } = &outcome {
        tracing::info!(%reason, "Run skipped");
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
