//! Market report model.
//!
//! A report is produced upstream on a fixed cadence and carries the
//! recommendation list for one purchase cycle. This system only reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use trade_desk_core::Recommendation;

/// A stored market report.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MarketReportRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    /// Recommendation list as produced upstream.
    pub recommendations: JsonValue,
}

impl MarketReportRecord {
    /// Decodes the stored recommendation list.
    ///
    /// # Errors
    /// Returns an error if any entry is not a known recommendation variant.
    pub fn decode_recommendations(&self) -> serde_json::Result<Vec<Recommendation>> {
        serde_json::from_value(self.recommendations.clone())
    }
}
