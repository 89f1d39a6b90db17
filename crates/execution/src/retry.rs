//! Weekly re-drive of pending spreads.
//!
//! Gates (in order): the retry window unless forced, an open market, an
//! existing market report. Then up to `max_rows` pending rows of the latest
//! report are retried one at a time until the time budget runs out.
//!
//! A row that remembers an earlier order is reconciled against it first. A new
//! order is only submitted once the earlier one is known to have ended unfilled.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{info, warn};

use trade_desk_alpaca::{BrokerClient, BrokerError};
use trade_desk_core::{AppConfig, Recommendation, RetryConfig};
use trade_desk_data::{AssetClass, PendingSpreadRecord, PendingSpreadUpdate};

use crate::allocation::notional_for;
use crate::error::{ExecutionError, Result};
use crate::spread::SpreadExecutor;
use crate::stores::Stores;
use crate::types::{order_record, RetrySummary, RunOutcome, SpreadOutcome};

/// True on the configured weekday at or after the configured UTC time.
#[must_use]
pub fn in_retry_window(now: DateTime<Utc>, config: &RetryConfig) -> bool {
    now.weekday() == config.weekday && now.time() >= config.not_before_utc
}

pub struct RetryScheduler {
    broker: Arc<dyn BrokerClient>,
    stores: Stores,
    spreads: SpreadExecutor,
    spread_budget: Decimal,
    config: RetryConfig,
}

impl RetryScheduler {
    pub fn new(broker: Arc<dyn BrokerClient>, stores: Stores, config: &AppConfig) -> Self {
        let spreads = SpreadExecutor::new(
            broker.clone(),
            config.execution.strike_band_pct,
            Duration::from_millis(config.execution.spread_poll_interval_ms),
        );
        Self {
            broker,
            stores,
            spreads,
            spread_budget: config.budgets.spread_usd,
            config: config.retry.clone(),
        }
    }

    /// Runs the batch now. `force` bypasses only the window check.
    ///
    /// # Errors
    /// Brokerage errors from the gate checks and store errors.
    pub async fn run(&self, force: bool) -> Result<RunOutcome<RetrySummary>> {
        self.run_at(Utc::now(), force).await
    }

    /// Runs the batch as if invoked at `now`.
    ///
    /// # Errors
    /// Same as [`Self::run`].
    pub async fn run_at(&self, now: DateTime<Utc>, force: bool) -> Result<RunOutcome<RetrySummary>> {
        if !force && !in_retry_window(now, &self.config) {
            info!(%now, "Outside retry window");
            return Ok(RunOutcome::skipped("outside retry window"));
        }

        if !self.broker.get_clock().await?.is_open {
            let today = now.date_naive();
            let sessions = self.broker.get_calendar(today, today).await?;
            let reason = if sessions.is_empty() {
                "market holiday"
            } else {
                "after hours"
            };
            info!(%today, reason, "Market closed, skipping spread retries");
            return Ok(RunOutcome::skipped(reason));
        }

        let Some(report) = self
            .stores
            .reports
            .latest_report()
            .await
            .map_err(ExecutionError::Store)?
        else {
            return Ok(RunOutcome::skipped("no market report"));
        };

        let rows = self
            .stores
            .pending
            .fetch_by_report(report.id, self.config.max_rows)
            .await
            .map_err(ExecutionError::Store)?;

        let mut summary = RetrySummary {
            report_id: report.id,
            fetched: rows.len(),
            ..RetrySummary::default()
        };
        info!(report_id = report.id, rows = rows.len(), "Retrying pending spreads");

        let budget = Duration::from_secs(self.config.time_budget_secs);
        let started = Instant::now();

        for row in &rows {
            if started.elapsed() >= budget {
                warn!(
                    report_id = report.id,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Retry time budget exhausted, leaving remaining rows"
                );
                summary.budget_exhausted = true;
                break;
            }
            self.retry_row(row, &mut summary).await?;
        }

        info!(
            report_id = report.id,
            filled = summary.filled,
            still_pending = summary.still_pending,
            skipped = summary.skipped,
            marked_failed = summary.marked_failed,
            deleted = summary.deleted,
            "Spread retry batch complete"
        );
        Ok(RunOutcome::Completed(summary))
    }

    async fn retry_row(&self, row: &PendingSpreadRecord, summary: &mut RetrySummary) -> Result<()> {
        let pending = &self.stores.pending;

        let spread = match row.decode_recommendation() {
            Ok(Recommendation::OptionVerticalSpread(spread)) => spread,
            Ok(other) => {
                let reason = format!("expected option_vertical_spread, got {}", other.kind());
                warn!(pending_id = row.id, %reason, "Marking pending row failed");
                pending
                    .update(row.id, &PendingSpreadUpdate::next_attempt(row, Utc::now()).failed(reason))
                    .await
                    .map_err(ExecutionError::Store)?;
                summary.marked_failed += 1;
                return Ok(());
            }
            Err(e) => {
                warn!(pending_id = row.id, error = %e, "Deleting undecodable pending row");
                pending.delete(row.id).await.map_err(ExecutionError::Store)?;
                summary.deleted += 1;
                return Ok(());
            }
        };

        if let Some(previous) = row.last_order_id.as_deref() {
            if !self.settle_previous_order(row, previous, summary).await? {
                return Ok(());
            }
        }

        let budget = notional_for(self.spread_budget, spread.allocation_percent);
        let wait = Duration::from_secs(self.config.wait_secs);
        let outcome = self.spreads.execute(&spread, budget, wait).await;
        let update = PendingSpreadUpdate::next_attempt(row, Utc::now());

        match outcome {
            SpreadOutcome::Filled { order, .. } => {
                self.stores
                    .orders
                    .record(&order_record(row.report_id, &order, AssetClass::OptionSpread))
                    .await
                    .map_err(ExecutionError::Store)?;
                pending.delete(row.id).await.map_err(ExecutionError::Store)?;
                info!(pending_id = row.id, order_id = %order.id, "Pending spread filled");
                summary.filled += 1;
            }
            SpreadOutcome::Pending {
                order_id,
                last_status,
                reason,
                ..
            } => {
                let update = update
                    .with_order(order_id, last_status.map(|s| s.to_string()))
                    .with_error(reason);
                pending
                    .update(row.id, &update)
                    .await
                    .map_err(ExecutionError::Store)?;
                summary.still_pending += 1;
            }
            SpreadOutcome::Skipped { reason } => {
                pending
                    .update(row.id, &update.with_error(reason))
                    .await
                    .map_err(ExecutionError::Store)?;
                summary.skipped += 1;
            }
        }

        Ok(())
    }

    /// Checks the order a row last submitted. Returns true when it ended
    /// without filling and a new order may be sent.
    async fn settle_previous_order(
        &self,
        row: &PendingSpreadRecord,
        order_id: &str,
        summary: &mut RetrySummary,
    ) -> Result<bool> {
        let pending = &self.stores.pending;
        let update = PendingSpreadUpdate::next_attempt(row, Utc::now());

        let order = match self.broker.get_order(order_id).await {
            Ok(order) => order,
            Err(BrokerError::OrderNotFound { .. }) => {
                warn!(
                    pending_id = row.id,
                    order_id = %order_id,
                    "Previous spread order unknown to broker"
                );
                return Ok(true);
            }
            Err(e) => {
                warn!(
                    pending_id = row.id,
                    order_id = %order_id,
                    error = %e,
                    "Previous spread order unreadable"
                );
                let update = update.with_error(format!("previous order {order_id} unreadable: {e}"));
                pending
                    .update(row.id, &update)
                    .await
                    .map_err(ExecutionError::Store)?;
                summary.still_pending += 1;
                return Ok(false);
            }
        };

        if order.is_filled() {
            self.stores
                .orders
                .record(&order_record(row.report_id, &order, AssetClass::OptionSpread))
                .await
                .map_err(ExecutionError::Store)?;
            pending.delete(row.id).await.map_err(ExecutionError::Store)?;
            info!(pending_id = row.id, order_id = %order.id, "Previous spread order filled");
            summary.filled += 1;
            return Ok(false);
        }
        if order.is_terminal() {
            return Ok(true);
        }

        if let Err(e) = self.broker.cancel_order(order_id).await {
            warn!(order_id = %order_id, error = %e, "Failed to cancel previous spread order");
        }
        warn!(
            pending_id = row.id,
            order_id = %order_id,
            status = %order.status,
            "Previous spread order still working"
        );
        let update = update
            .with_order(None, Some(order.status.to_string()))
            .with_error(format!("previous order {order_id} still {}", order.status));
        pending
            .update(row.id, &update)
            .await
            .map_err(ExecutionError::Store)?;
        summary.still_pending += 1;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Weekday};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use trade_desk_alpaca::{MockBroker, MockCall, OrderRequest, OrderStatus, StatusStep};
    use trade_desk_core::{OptionType, SpreadRecommendation, StockAction, StockRecommendation};
    use trade_desk_data::{InMemoryStore, NewPendingSpread, PendingSpreadStatus, PendingSpreadStore};

    /// Monday 2026-10-19 15:00 UTC.
    fn monday_afternoon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap()
    }

    fn spread_json() -> serde_json::Value {
        serde_json::to_value(Recommendation::OptionVerticalSpread(SpreadRecommendation {
            underlying_ticker: "SPY".into(),
            option_type: OptionType::Call,
            expiration_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            contracts: 1,
            allocation_percent: dec!(50),
        }))
        .unwrap()
    }

    fn quoted_broker() -> MockBroker {
        MockBroker::new()
            .with_price("SPY", dec!(100))
            .with_option("SPY261120C00100000", dec!(2.30), dec!(2.50))
            .with_option("SPY261120C00105000", dec!(1.00), dec!(1.10))
    }

    fn scheduler(broker: Arc<MockBroker>, store: Arc<InMemoryStore>) -> RetryScheduler {
        RetryScheduler::new(broker, Stores::in_memory(store), &AppConfig::default())
    }

    fn store_with_report() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.add_raw_report(1, json!([]));
        store
    }

    /// Submits a spread directly and queues a row that remembers it.
    async fn pending_with_order(broker: &MockBroker, store: &InMemoryStore) -> String {
        let order = broker
            .create_order(&OrderRequest::vertical_spread_limit(
                "SPY261120C00100000",
                "SPY261120C00105000",
                1,
                dec!(1.50),
            ))
            .await
            .unwrap();
        let rec: Recommendation = serde_json::from_value(spread_json()).unwrap();
        let row = NewPendingSpread::first_attempt(1, &rec, Utc::now())
            .unwrap()
            .with_order(Some(order.id.clone()), Some("new".into()));
        store.insert(&row).await.unwrap();
        order.id
    }

    fn completed(outcome: RunOutcome<RetrySummary>) -> RetrySummary {
        match outcome {
            RunOutcome::Completed(summary) => summary,
            RunOutcome::Skipped { reason } => panic!("retry skipped: {reason}"),
        }
    }

    // =========================================================================
    // Gates
    // =========================================================================

    #[test]
    fn window_requires_weekday_and_time() {
        let config = RetryConfig::default();
        assert!(in_retry_window(monday_afternoon(), &config));

        let early = Utc.with_ymd_and_hms(2026, 10, 19, 14, 29, 59).unwrap();
        assert!(!in_retry_window(early, &config));

        let tuesday = Utc.with_ymd_and_hms(2026, 10, 20, 15, 0, 0).unwrap();
        assert!(!in_retry_window(tuesday, &config));

        let friday_config = RetryConfig {
            weekday: Weekday::Fri,
            not_before_utc: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            ..RetryConfig::default()
        };
        let friday = Utc.with_ymd_and_hms(2026, 10, 23, 9, 0, 0).unwrap();
        assert!(in_retry_window(friday, &friday_config));
    }

    #[tokio::test(start_paused = true)]
    async fn outside_window_does_nothing() {
        let broker = Arc::new(quoted_broker());
        let store = store_with_report();
        store.add_raw_pending(1, spread_json());

        let tuesday = Utc.with_ymd_and_hms(2026, 10, 20, 15, 0, 0).unwrap();
        let outcome = scheduler(broker.clone(), store.clone())
            .run_at(tuesday, false)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::skipped("outside retry window"));
        assert_eq!(broker.call_count(), 0);
        assert_eq!(store.pending_rows()[0].attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn force_bypasses_window_only() {
        let broker = Arc::new(quoted_broker().with_market_open(false));
        let tuesday = Utc.with_ymd_and_hms(2026, 10, 20, 15, 0, 0).unwrap();

        let outcome = scheduler(broker, store_with_report())
            .run_at(tuesday, true)
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::skipped("market holiday"));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_market_distinguishes_holiday_from_after_hours() {
        let broker = Arc::new(
            quoted_broker()
                .with_market_open(false)
                .with_session(monday_afternoon().date_naive()),
        );
        let outcome = scheduler(broker.clone(), store_with_report())
            .run_at(monday_afternoon(), false)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::skipped("after hours"));
        assert_eq!(broker.calls(), vec![MockCall::GetClock, MockCall::GetCalendar]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_report_does_nothing() {
        let broker = Arc::new(quoted_broker());
        let outcome = scheduler(broker, Arc::new(InMemoryStore::new()))
            .run_at(monday_afternoon(), false)
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::skipped("no market report"));
    }

    // =========================================================================
    // Row handling
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn filled_retry_deletes_row_and_records_once() {
        let broker = Arc::new(quoted_broker());
        let store = store_with_report();
        store.add_raw_pending(1, spread_json());

        let summary = completed(
            scheduler(broker, store.clone())
                .run_at(monday_afternoon(), false)
                .await
                .unwrap(),
        );

        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.filled, 1);
        assert!(store.pending_rows().is_empty());

        let orders = store.order_rows();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].report_id, 1);
        assert_eq!(orders[0].asset_class, "option_spread");
    }

    #[tokio::test(start_paused = true)]
    async fn unfilled_retry_updates_row_in_place() {
        let broker = Arc::new(
            quoted_broker().with_order_script(vec![StatusStep::Status(OrderStatus::Accepted)]),
        );
        let store = store_with_report();
        let id = store.add_raw_pending(1, spread_json());

        let summary = completed(
            scheduler(broker.clone(), store.clone())
                .run_at(monday_afternoon(), false)
                .await
                .unwrap(),
        );

        assert_eq!(summary.still_pending, 1);
        assert_eq!(broker.canceled_orders().len(), 1);

        let rows = store.pending_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].attempts, 2);
        assert_eq!(rows[0].last_order_id.as_deref(), Some("mock-order-1"));
        assert_eq!(rows[0].last_order_status.as_deref(), Some("accepted"));
        assert!(rows[0].last_error.as_deref().unwrap().contains("20s"));
        assert!(store.order_rows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn skipped_retry_keeps_row() {
        let broker = Arc::new(MockBroker::new());
        let store = store_with_report();
        store.add_raw_pending(1, spread_json());

        let summary = completed(
            scheduler(broker, store.clone())
                .run_at(monday_afternoon(), false)
                .await
                .unwrap(),
        );

        assert_eq!(summary.skipped, 1);
        let rows = store.pending_rows();
        assert_eq!(rows[0].attempts, 2);
        assert!(rows[0].last_error.as_deref().unwrap().contains("no live price"));
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_variant_is_marked_failed_without_broker_call() {
        let broker = Arc::new(quoted_broker());
        let store = store_with_report();
        let stock = serde_json::to_value(Recommendation::Stock(StockRecommendation {
            ticker: "AAPL".into(),
            action: StockAction::Buy,
            allocation_percent: dec!(100),
        }))
        .unwrap();
        store.add_raw_pending(1, stock);
        store.add_raw_pending(1, json!({"garbage": true}));

        let summary = completed(
            scheduler(broker.clone(), store.clone())
                .run_at(monday_afternoon(), false)
                .await
                .unwrap(),
        );

        assert_eq!(summary.marked_failed, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(broker.calls(), vec![MockCall::GetClock]);

        let rows = store.pending_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status(), Some(PendingSpreadStatus::Failed));
        assert_eq!(rows[0].attempts, 2);
        assert!(rows[0].last_error.as_deref().unwrap().contains("stock"));
    }

    #[tokio::test(start_paused = true)]
    async fn time_budget_leaves_remaining_rows() {
        let broker = Arc::new(
            quoted_broker().with_order_script(vec![StatusStep::Status(OrderStatus::New)]),
        );
        let store = store_with_report();
        for _ in 0..3 {
            store.add_raw_pending(1, spread_json());
        }

        let mut config = AppConfig::default();
        config.retry.time_budget_secs = 30;
        let scheduler = RetryScheduler::new(broker, Stores::in_memory(store.clone()), &config);

        let summary = completed(scheduler.run_at(monday_afternoon(), false).await.unwrap());

        // Each attempt waits 20s: rows start at 0s and 20s, the third would start at 40s.
        assert!(summary.budget_exhausted);
        assert_eq!(summary.still_pending, 2);
        let attempts: Vec<i32> = store.pending_rows().iter().map(|r| r.attempts).collect();
        assert_eq!(attempts, vec![2, 2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_respects_max_rows() {
        let broker = Arc::new(quoted_broker());
        let store = store_with_report();
        for _ in 0..4 {
            store.add_raw_pending(1, spread_json());
        }
        store.add_raw_pending(2, spread_json());

        let mut config = AppConfig::default();
        config.retry.max_rows = 3;
        let scheduler = RetryScheduler::new(broker, Stores::in_memory(store.clone()), &config);

        let summary = completed(scheduler.run_at(monday_afternoon(), false).await.unwrap());
        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.filled, 3);
        assert_eq!(store.pending_rows().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn late_fill_of_previous_order_is_recorded_without_resubmitting() {
        // The earlier order could not be canceled and filled afterwards.
        let broker = Arc::new(
            quoted_broker()
                .with_next_order_script(vec![StatusStep::Status(OrderStatus::Filled)])
                .with_cancel_failure(),
        );
        let store = store_with_report();
        let previous = pending_with_order(&broker, &store).await;

        let summary = completed(
            scheduler(broker.clone(), store.clone())
                .run_at(monday_afternoon(), false)
                .await
                .unwrap(),
        );

        assert_eq!(summary.filled, 1);
        assert_eq!(broker.submitted_orders().len(), 1);
        assert!(!broker.calls().contains(&MockCall::GetLatestTrade("SPY".into())));
        assert!(store.pending_rows().is_empty());

        let orders = store.order_rows();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].broker_order_id, previous);
    }

    #[tokio::test(start_paused = true)]
    async fn working_previous_order_blocks_new_submission_until_canceled() {
        let broker = Arc::new(
            quoted_broker().with_next_order_script(vec![StatusStep::Status(OrderStatus::New)]),
        );
        let store = store_with_report();
        let previous = pending_with_order(&broker, &store).await;
        let scheduler = scheduler(broker.clone(), store.clone());

        let summary = completed(scheduler.run_at(monday_afternoon(), false).await.unwrap());
        assert_eq!(summary.still_pending, 1);
        assert_eq!(broker.submitted_orders().len(), 1);
        assert_eq!(broker.canceled_orders(), vec![previous.clone()]);

        let rows = store.pending_rows();
        assert_eq!(rows[0].attempts, 2);
        assert_eq!(rows[0].last_order_id.as_deref(), Some(previous.as_str()));
        assert!(rows[0].last_error.as_deref().unwrap().contains("still new"));
        assert!(store.order_rows().is_empty());

        // The cancel has settled, so the next run sends a fresh order.
        let summary = completed(scheduler.run_at(monday_afternoon(), false).await.unwrap());
        assert_eq!(summary.filled, 1);
        assert_eq!(broker.submitted_orders().len(), 2);
        assert!(store.pending_rows().is_empty());

        let orders = store.order_rows();
        assert_eq!(orders.len(), 1);
        assert_ne!(orders[0].broker_order_id, previous);
    }
}
