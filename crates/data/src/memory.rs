//! In-memory implementation of every store trait.
//!
//! Used by tests and dry runs. Behaves like the Postgres repositories:
//! sequential IDs, `fetch_by_report` returns only pending rows oldest first.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use trade_desk_core::Recommendation;

use crate::models::{
    MarketReportRecord, NewOrderRecord, NewPendingSpread, OrderHistoryRecord, PendingSpreadRecord,
    PendingSpreadStatus, PendingSpreadUpdate,
};
use crate::store::{OrderHistoryStore, PendingSpreadStore, ReportStore};

#[derive(Debug, Default)]
struct Tables {
    reports: Vec<MarketReportRecord>,
    pending: Vec<PendingSpreadRecord>,
    orders: Vec<OrderHistoryRecord>,
    next_pending_id: i64,
    next_order_id: i64,
}

/// Shared in-memory tables for reports, pending spreads and order history.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a report built from a recommendation list. Later calls produce
    /// later `created_at` values.
    ///
    /// # Errors
    /// Returns an error if the recommendations cannot be serialised.
    pub fn add_report(&self, id: i64, recommendations: &[Recommendation]) -> Result<()> {
        self.add_raw_report(id, serde_json::to_value(recommendations)?);
        Ok(())
    }

    /// Adds a report with an arbitrary JSON payload.
    pub fn add_raw_report(&self, id: i64, recommendations: JsonValue) {
        let mut tables = self.tables.lock();
        let offset = i64::try_from(tables.reports.len()).unwrap_or(i64::MAX);
        let created_at = Utc::now() + Duration::milliseconds(offset);
        tables.reports.push(MarketReportRecord {
            id,
            created_at,
            recommendations,
        });
    }

    /// Inserts a pending row with an arbitrary payload.
    pub fn add_raw_pending(&self, report_id: i64, recommendation: JsonValue) -> i64 {
        let mut tables = self.tables.lock();
        tables.next_pending_id += 1;
        let id = tables.next_pending_id;
        let now = Utc::now();
        tables.pending.push(PendingSpreadRecord {
            id,
            report_id,
            recommendation,
            status: PendingSpreadStatus::Pending.as_str().to_string(),
            attempts: 1,
            last_attempt_at: Some(now),
            last_order_id: None,
            last_order_status: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Every pending spread row, any status.
    #[must_use]
    pub fn pending_rows(&self) -> Vec<PendingSpreadRecord> {
        self.tables.lock().pending.clone()
    }

    /// Every recorded order.
    #[must_use]
    pub fn order_rows(&self) -> Vec<OrderHistoryRecord> {
        self.tables.lock().orders.clone()
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn latest_report(&self) -> Result<Option<MarketReportRecord>> {
        Ok(self
            .tables
            .lock()
            .reports
            .iter()
            .max_by_key(|r| (r.created_at, r.id))
            .cloned())
    }

    async fn report(&self, id: i64) -> Result<Option<MarketReportRecord>> {
        Ok(self
            .tables
            .lock()
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }
}

#[async_trait]
impl PendingSpreadStore for InMemoryStore {
    async fn insert(&self, row: &NewPendingSpread) -> Result<i64> {
        let mut tables = self.tables.lock();
        tables.next_pending_id += 1;
        let id = tables.next_pending_id;
        let now = Utc::now();
        tables.pending.push(PendingSpreadRecord {
            id,
            report_id: row.report_id,
            recommendation: row.recommendation.clone(),
            status: PendingSpreadStatus::Pending.as_str().to_string(),
            attempts: row.attempts,
            last_attempt_at: Some(row.last_attempt_at),
            last_order_id: row.last_order_id.clone(),
            last_order_status: row.last_order_status.clone(),
            last_error: row.last_error.clone(),
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn fetch_by_report(
        &self,
        report_id: i64,
        limit: u32,
    ) -> Result<Vec<PendingSpreadRecord>> {
        let tables = self.tables.lock();
        let mut rows: Vec<PendingSpreadRecord> = tables
            .pending
            .iter()
            .filter(|r| {
                r.report_id == report_id && r.status() == Some(PendingSpreadStatus::Pending)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.id));
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn update(&self, id: i64, update: &PendingSpreadUpdate) -> Result<()> {
        let mut tables = self.tables.lock();
        let row = tables
            .pending
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("pending spread {id} not found"))?;

        row.status = update.status.as_str().to_string();
        row.attempts = update.attempts;
        row.last_attempt_at = Some(update.last_attempt_at);
        row.last_order_id = update.last_order_id.clone();
        row.last_order_status = update.last_order_status.clone();
        row.last_error = update.last_error.clone();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.tables.lock().pending.retain(|r| r.id != id);
        Ok(())
    }
}

#[async_trait]
impl OrderHistoryStore for InMemoryStore {
    async fn record(&self, order: &NewOrderRecord) -> Result<i64> {
        let mut tables = self.tables.lock();
        if tables
            .orders
            .iter()
            .any(|o| o.broker_order_id == order.broker_order_id)
        {
            return Err(anyhow!(
                "order {} already recorded",
                order.broker_order_id
            ));
        }

        tables.next_order_id += 1;
        let id = tables.next_order_id;
        tables.orders.push(OrderHistoryRecord {
            id,
            report_id: order.report_id,
            broker_order_id: order.broker_order_id.clone(),
            asset_class: order.asset_class.as_str().to_string(),
            symbols: order.symbols.clone(),
            side: order.side.clone(),
            quantity: order.quantity,
            notional: order.notional,
            limit_price: order.limit_price,
            status: order.status.clone(),
            filled_qty: order.filled_qty,
            filled_avg_price: order.filled_avg_price,
            submitted_at: order.submitted_at,
            filled_at: order.filled_at,
            recorded_at: Utc::now(),
        });
        Ok(id)
    }

    async fn exists_for_report(&self, report_id: i64) -> Result<bool> {
        Ok(self
            .tables
            .lock()
            .orders
            .iter()
            .any(|o| o.report_id == report_id))
    }

    async fn list_by_report(&self, report_id: i64) -> Result<Vec<OrderHistoryRecord>> {
        Ok(self
            .tables
            .lock()
            .orders
            .iter()
            .filter(|o| o.report_id == report_id)
            .cloned()
            .collect())
    }
}
