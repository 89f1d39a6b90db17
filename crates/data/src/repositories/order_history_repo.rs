//! Order history repository.
//!
//! Stores filled orders keyed by the report that produced them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{NewOrderRecord, OrderHistoryRecord};
use crate::store::OrderHistoryStore;

/// Repository for filled order rows.
#[derive(Debug, Clone)]
pub struct OrderHistoryRepository {
    pool: PgPool,
}

impl OrderHistoryRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderHistoryStore for OrderHistoryRepository {
    async fn record(&self, order: &NewOrderRecord) -> Result<i64> {
        let inserted: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO order_history
                (report_id, broker_order_id, asset_class, symbols, side, quantity, notional,
                 limit_price, status, filled_qty, filled_avg_price, submitted_at, filled_at,
                 recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
            RETURNING id
            "#,
        )
        .bind(order.report_id)
        .bind(&order.broker_order_id)
        .bind(order.asset_class.as_str())
        .bind(&order.symbols)
        .bind(&order.side)
        .bind(order.quantity)
        .bind(order.notional)
        .bind(order.limit_price)
        .bind(&order.status)
        .bind(order.filled_qty)
        .bind(order.filled_avg_price)
        .bind(order.submitted_at)
        .bind(order.filled_at)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to record order {}", order.broker_order_id))?;

        Ok(inserted.0)
    }

    async fn exists_for_report(&self, report_id: i64) -> Result<bool> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM order_history WHERE report_id = $1)",
        )
        .bind(report_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn list_by_report(&self, report_id: i64) -> Result<Vec<OrderHistoryRecord>> {
        let records = sqlx::query_as::<_, OrderHistoryRecord>(
            r#"
            SELECT id, report_id, broker_order_id, asset_class, symbols, side, quantity,
                   notional, limit_price, status, filled_qty, filled_avg_price, submitted_at,
                   filled_at, recorded_at
            FROM order_history
            WHERE report_id = $1
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
