//! Pending spread order repository.
//!
//! Provides the insert/fetch/update/delete surface the retry scheduler works
//! against.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::models::{
    NewPendingSpread, PendingSpreadRecord, PendingSpreadStatus, PendingSpreadUpdate,
};
use crate::store::PendingSpreadStore;

/// Repository for pending spread rows.
#[derive(Debug, Clone)]
pub struct PendingSpreadRepository {
    pool: PgPool,
}

impl PendingSpreadRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingSpreadStore for PendingSpreadRepository {
    async fn insert(&self, row: &NewPendingSpread) -> Result<i64> {
        let now = Utc::now();
        let inserted: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO pending_spread_orders
                (report_id, recommendation, status, attempts, last_attempt_at,
                 last_order_id, last_order_status, last_error, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id
            "#,
        )
        .bind(row.report_id)
        .bind(&row.recommendation)
        .bind(PendingSpreadStatus::Pending.as_str())
        .bind(row.attempts)
        .bind(row.last_attempt_at)
        .bind(&row.last_order_id)
        .bind(&row.last_order_status)
        .bind(&row.last_error)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert pending spread")?;

        Ok(inserted.0)
    }

    async fn fetch_by_report(
        &self,
        report_id: i64,
        limit: u32,
    ) -> Result<Vec<PendingSpreadRecord>> {
        let records = sqlx::query_as::<_, PendingSpreadRecord>(
            r#"
            SELECT id, report_id, recommendation, status, attempts, last_attempt_at,
                   last_order_id, last_order_status, last_error, created_at, updated_at
            FROM pending_spread_orders
            WHERE report_id = $1 AND status = $2
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#,
        )
        .bind(report_id)
        .bind(PendingSpreadStatus::Pending.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn update(&self, id: i64, update: &PendingSpreadUpdate) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pending_spread_orders
            SET status = $2, attempts = $3, last_attempt_at = $4, last_order_id = $5,
                last_order_status = $6, last_error = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.status.as_str())
        .bind(update.attempts)
        .bind(update.last_attempt_at)
        .bind(&update.last_order_id)
        .bind(&update.last_order_status)
        .bind(&update.last_error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update pending spread {id}"))?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM pending_spread_orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete pending spread {id}"))?;

        Ok(())
    }
}
