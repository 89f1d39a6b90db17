//! Market report repository.
//!
//! Reports are written upstream; this repository only reads them.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::MarketReportRecord;
use crate::store::ReportStore;

/// Repository for market report reads.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn latest_report(&self) -> Result<Option<MarketReportRecord>> {
        let record = sqlx::query_as::<_, MarketReportRecord>(
            r#"
            SELECT id, created_at, recommendations
            FROM market_reports
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn report(&self, id: i64) -> Result<Option<MarketReportRecord>> {
        let record = sqlx::query_as::<_, MarketReportRecord>(
            r#"
            SELECT id, created_at, recommendations
            FROM market_reports
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
