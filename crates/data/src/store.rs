//! Storage contracts used by the execution layer.
//!
//! Postgres repositories and the in-memory store both implement these, so
//! executors and schedulers never depend on a concrete backend.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    MarketReportRecord, NewOrderRecord, NewPendingSpread, OrderHistoryRecord, PendingSpreadRecord,
    PendingSpreadUpdate,
};

/// Read access to upstream market reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Most recently created report.
    async fn latest_report(&self) -> Result<Option<MarketReportRecord>>;

    async fn report(&self, id: i64) -> Result<Option<MarketReportRecord>>;
}

/// Durable queue of spread attempts that did not resolve in their wait window.
#[async_trait]
pub trait PendingSpreadStore: Send + Sync {
    /// Inserts a new row and returns its ID.
    async fn insert(&self, row: &NewPendingSpread) -> Result<i64>;

    /// Rows still in `pending` status for a report, oldest first.
    async fn fetch_by_report(&self, report_id: i64, limit: u32)
        -> Result<Vec<PendingSpreadRecord>>;

    async fn update(&self, id: i64, update: &PendingSpreadUpdate) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// Local mirror of filled orders.
#[async_trait]
pub trait OrderHistoryStore: Send + Sync {
    /// Inserts a filled order and returns its ID.
    async fn record(&self, order: &NewOrderRecord) -> Result<i64>;

    /// True if any order has been recorded against `report_id`.
    async fn exists_for_report(&self, report_id: i64) -> Result<bool>;

    async fn list_by_report(&self, report_id: i64) -> Result<Vec<OrderHistoryRecord>>;
}
