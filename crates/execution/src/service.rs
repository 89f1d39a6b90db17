//! Entry points shared by the HTTP trigger surface and the CLI.

use std::sync::Arc;

use trade_desk_alpaca::BrokerClient;
use trade_desk_core::AppConfig;

use crate::error::Result;
use crate::purchase::PurchaseRunner;
use crate::retry::RetryScheduler;
use crate::stores::Stores;
use crate::types::{RetrySummary, RunOutcome, RunSummary};

/// Owns one purchase runner and one retry scheduler over the same broker and
/// stores.
pub struct TradeDesk {
    purchases: PurchaseRunner,
    retries: RetryScheduler,
}

impl TradeDesk {
    pub fn new(broker: Arc<dyn BrokerClient>, stores: Stores, config: &AppConfig) -> Self {
        Self {
            purchases: PurchaseRunner::new(broker.clone(), stores.clone(), config),
            retries: RetryScheduler::new(broker, stores, config),
        }
    }

    /// Primary purchase run for the latest report.
    pub async fn purchase(&self) -> Result<RunOutcome<RunSummary>> {
        self.purchases.run_primary().await
    }

    /// Catch-up run; a no-op if the report already has recorded orders.
    pub async fn catch_up(&self, report_id: Option<i64>) -> Result<RunOutcome<RunSummary>> {
        self.purchases.run_catch_up(report_id).await
    }

    pub async fn retry_spreads(&self, force: bool) -> Result<RunOutcome<RetrySummary>> {
        self.retries.run(force).await
    }
}
