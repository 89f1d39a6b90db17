//! Purchase runs: the primary run and the idempotent catch-up run.
//!
//! A run loads one market report, validates its recommendations, then works
//! through equity buys, equity sells and spreads strictly in that order, one
//! order at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use trade_desk_alpaca::{BrokerClient, Order, PollConfig};
use trade_desk_core::{validate_recommendations, AppConfig, Recommendation, SpreadRecommendation};
use trade_desk_data::{AssetClass, MarketReportRecord, NewPendingSpread};

use crate::allocation::notional_for;
use crate::equity::{EquityExecutor, SellResult};
use crate::error::{ExecutionError, Result};
use crate::spread::SpreadExecutor;
use crate::stores::Stores;
use crate::types::{
    order_record, OrderSummary, RunOutcome, RunSummary, SpreadOutcome, SpreadSummary,
};

pub struct PurchaseRunner {
    broker: Arc<dyn BrokerClient>,
    stores: Stores,
    equity: EquityExecutor,
    spreads: SpreadExecutor,
    spread_budget: Decimal,
    spread_wait: Duration,
    require_market_open: bool,
}

impl PurchaseRunner {
    pub fn new(broker: Arc<dyn BrokerClient>, stores: Stores, config: &AppConfig) -> Self {
        let exec = &config.execution;
        let equity = EquityExecutor::new(
            broker.clone(),
            config.budgets.equity_usd,
            PollConfig::new(
                Duration::from_millis(exec.equity_poll_interval_ms),
                Duration::from_secs(exec.equity_timeout_secs),
            ),
        )
        .with_sell_qty_decimals(exec.sell_qty_decimals);
        let spreads = SpreadExecutor::new(
            broker.clone(),
            exec.strike_band_pct,
            Duration::from_millis(exec.spread_poll_interval_ms),
        );

        Self {
            broker,
            stores,
            equity,
            spreads,
            spread_budget: config.budgets.spread_usd,
            spread_wait: Duration::from_secs(exec.spread_wait_secs),
            require_market_open: exec.require_market_open,
        }
    }

    /// Purchases the latest market report.
    ///
    /// # Errors
    /// Validation failures, equity fill failures and store errors.
    pub async fn run_primary(&self) -> Result<RunOutcome<RunSummary>> {
        let Some(report) = self
            .stores
            .reports
            .latest_report()
            .await
            .map_err(ExecutionError::Store)?
        else {
            info!("No market report, skipping purchase run");
            return Ok(RunOutcome::skipped("no market report"));
        };

        self.purchase_report(&report).await
    }

    /// Purchases a report only if nothing has been recorded against it yet.
    ///
    /// Targets `report_id` when given, else the latest report. The check runs
    /// before any brokerage call.
    ///
    /// # Errors
    /// Same as [`Self::run_primary`].
    pub async fn run_catch_up(&self, report_id: Option<i64>) -> Result<RunOutcome<RunSummary>> {
        let report = match report_id {
            Some(id) => self.stores.reports.report(id).await,
            None => self.stores.reports.latest_report().await,
        }
        .map_err(ExecutionError::Store)?;

        let Some(report) = report else {
            let reason = report_id.map_or_else(
                || "no market report".to_string(),
                |id| format!("market report {id} not found"),
            );
            info!(%reason, "Skipping catch-up run");
            return Ok(RunOutcome::skipped(reason));
        };

        if self
            .stores
            .orders
            .exists_for_report(report.id)
            .await
            .map_err(ExecutionError::Store)?
        {
            info!(report_id = report.id, "Report already purchased, skipping catch-up run");
            return Ok(RunOutcome::skipped("already purchased"));
        }

        self.purchase_report(&report).await
    }

    async fn purchase_report(&self, report: &MarketReportRecord) -> Result<RunOutcome<RunSummary>> {
        if self.require_market_open && !self.broker.get_clock().await?.is_open {
            info!(report_id = report.id, "Market closed, skipping purchase run");
            return Ok(RunOutcome::skipped("market closed"));
        }

        let recommendations = report
            .decode_recommendations()
            .map_err(|e| ExecutionError::Payload(format!("report {}: {e}", report.id)))?;
        let set = validate_recommendations(&recommendations).inspect_err(|e| {
            error!(report_id = report.id, error = %e, "Recommendations failed validation");
        })?;

        info!(
            report_id = report.id,
            stocks = set.stocks.len(),
            spreads = set.spreads.len(),
            "Starting purchase run"
        );
        let mut summary = RunSummary::new(report.id);

        for rec in set.buys() {
            let order = self.equity.buy(rec).await?;
            self.record_equity(report.id, &order).await?;
            summary.equity_orders.push(OrderSummary::from(&order));
        }

        let mut sells = set.sells().peekable();
        if sells.peek().is_some() {
            let positions = self.broker.get_positions().await?;
            for rec in sells {
                match self.equity.sell(rec, &positions).await? {
                    SellResult::Filled(order) => {
                        self.record_equity(report.id, &order).await?;
                        summary.equity_orders.push(OrderSummary::from(&order));
                    }
                    SellResult::Skipped(item) => summary.skipped_sells.push(item),
                }
            }
        }

        for rec in &set.spreads {
            let outcome = self.purchase_spread(report.id, rec).await?;
            summary
                .spreads
                .push(SpreadSummary::from_outcome(&rec.underlying_ticker, &outcome));
        }

        info!(
            report_id = report.id,
            equity_orders = summary.equity_orders.len(),
            skipped_sells = summary.skipped_sells.len(),
            spreads_filled = summary.spread_count("filled"),
            spreads_pending = summary.spread_count("pending"),
            spreads_skipped = summary.spread_count("skipped"),
            "Purchase run complete"
        );
        Ok(RunOutcome::Completed(summary))
    }

    async fn purchase_spread(
        &self,
        report_id: i64,
        rec: &SpreadRecommendation,
    ) -> Result<SpreadOutcome> {
        let budget = notional_for(self.spread_budget, rec.allocation_percent);
        let outcome = self.spreads.execute(rec, budget, self.spread_wait).await;

        match &outcome {
            SpreadOutcome::Filled { order, .. } => {
                self.stores
                    .orders
                    .record(&order_record(report_id, order, AssetClass::OptionSpread))
                    .await
                    .map_err(ExecutionError::Store)?;
            }
            SpreadOutcome::Pending {
                order_id,
                last_status,
                reason,
                ..
            } => {
                let snapshot = Recommendation::OptionVerticalSpread(rec.clone());
                let row = NewPendingSpread::first_attempt(report_id, &snapshot, Utc::now())
                    .map_err(|e| ExecutionError::Payload(e.to_string()))?
                    .with_order(order_id.clone(), last_status.map(|s| s.to_string()))
                    .with_error(reason.clone());
                let id = self
                    .stores
                    .pending
                    .insert(&row)
                    .await
                    .map_err(ExecutionError::Store)?;
                warn!(
                    pending_id = id,
                    order_id = ?order_id,
                    ticker = %rec.underlying_ticker,
                    "Spread queued for retry"
                );
            }
            SpreadOutcome::Skipped { .. } => {}
        }

        Ok(outcome)
    }

    async fn record_equity(&self, report_id: i64, order: &Order) -> Result<()> {
        self.stores
            .orders
            .record(&order_record(report_id, order, AssetClass::Equity))
            .await
            .map_err(ExecutionError::Store)?;
        Ok(())
    }
}
