//! Pending spread order model.
//!
//! One row per spread recommendation whose order did not fill inside its wait
//! window. Rows are mutated on every retry and deleted once the spread fills
//! or the stored payload turns out to be unusable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use trade_desk_core::Recommendation;

/// Lifecycle of a pending spread row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingSpreadStatus {
    /// Eligible for retry.
    Pending,
    /// Payload was the wrong recommendation variant; never retried.
    Failed,
}

impl PendingSpreadStatus {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A persisted pending spread.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingSpreadRecord {
    pub id: i64,
    pub report_id: i64,
    /// Snapshot of the recommendation that produced the order.
    pub recommendation: JsonValue,
    /// "pending" or "failed".
    pub status: String,
    pub attempts: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_order_id: Option<String>,
    pub last_order_status: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingSpreadRecord {
    #[must_use]
    pub fn status(&self) -> Option<PendingSpreadStatus> {
        PendingSpreadStatus::parse(&self.status)
    }

    /// Decodes the stored recommendation snapshot.
    ///
    /// # Errors
    /// Returns an error if the snapshot is not a recommendation at all.
    pub fn decode_recommendation(&self) -> serde_json::Result<Recommendation> {
        serde_json::from_value(self.recommendation.clone())
    }
}

/// Values for a freshly inserted pending spread.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPendingSpread {
    pub report_id: i64,
    pub recommendation: JsonValue,
    pub attempts: i32,
    pub last_attempt_at: DateTime<Utc>,
    pub last_order_id: Option<String>,
    pub last_order_status: Option<String>,
    pub last_error: Option<String>,
}

impl NewPendingSpread {
    /// Builds a first-attempt row from a recommendation.
    ///
    /// # Errors
    /// Returns an error if the recommendation cannot be serialised.
    pub fn first_attempt(
        report_id: i64,
        recommendation: &Recommendation,
        attempted_at: DateTime<Utc>,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            report_id,
            recommendation: serde_json::to_value(recommendation)?,
            attempts: 1,
            last_attempt_at: attempted_at,
            last_order_id: None,
            last_order_status: None,
            last_error: None,
        })
    }

    #[must_use]
    pub fn with_order(mut self, order_id: Option<String>, status: Option<String>) -> Self {
        self.last_order_id = order_id;
        self.last_order_status = status;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }
}

/// In-place mutation applied after a retry attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSpreadUpdate {
    pub status: PendingSpreadStatus,
    pub attempts: i32,
    pub last_attempt_at: DateTime<Utc>,
    pub last_order_id: Option<String>,
    pub last_order_status: Option<String>,
    pub last_error: Option<String>,
}

impl PendingSpreadUpdate {
    /// Next attempt on `row`, keeping the previous order reference until a
    /// new one is supplied.
    #[must_use]
    pub fn next_attempt(row: &PendingSpreadRecord, attempted_at: DateTime<Utc>) -> Self {
        Self {
            status: PendingSpreadStatus::Pending,
            attempts: row.attempts.saturating_add(1),
            last_attempt_at: attempted_at,
            last_order_id: row.last_order_id.clone(),
            last_order_status: row.last_order_status.clone(),
            last_error: None,
        }
    }

    #[must_use]
    pub fn with_order(mut self, order_id: Option<String>, status: Option<String>) -> Self {
        if order_id.is_some() {
            self.last_order_id = order_id;
        }
        if status.is_some() {
            self.last_order_status = status;
        }
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }

    /// Marks the row as permanently failed.
    #[must_use]
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.status = PendingSpreadStatus::Failed;
        self.last_error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use trade_desk_core::{OptionType, SpreadRecommendation};

    fn spread() -> Recommendation {
        Recommendation::OptionVerticalSpread(SpreadRecommendation {
            underlying_ticker: "SPY".into(),
            option_type: OptionType::Call,
            expiration_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            contracts: 2,
            allocation_percent: dec!(50),
        })
    }

    fn row() -> PendingSpreadRecord {
        let now = Utc::now();
        PendingSpreadRecord {
            id: 1,
            report_id: 9,
            recommendation: serde_json::to_value(spread()).unwrap(),
            status: "pending".into(),
            attempts: 1,
            last_attempt_at: Some(now),
            last_order_id: Some("ord-1".into()),
            last_order_status: Some("new".into()),
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [PendingSpreadStatus::Pending, PendingSpreadStatus::Failed] {
            assert_eq!(PendingSpreadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PendingSpreadStatus::parse("PENDING"), Some(PendingSpreadStatus::Pending));
        assert_eq!(PendingSpreadStatus::parse("done"), None);
    }

    #[test]
    fn first_attempt_snapshots_recommendation() {
        let new = NewPendingSpread::first_attempt(9, &spread(), Utc::now())
            .unwrap()
            .with_order(Some("ord-1".into()), Some("accepted".into()));

        assert_eq!(new.attempts, 1);
        assert_eq!(new.recommendation["kind"], "option_vertical_spread");
        assert_eq!(new.last_order_status.as_deref(), Some("accepted"));
    }

    #[test]
    fn next_attempt_increments_and_keeps_last_order() {
        let update = PendingSpreadUpdate::next_attempt(&row(), Utc::now())
            .with_order(None, Some("canceled".into()))
            .with_error("not filled within 20s");

        assert_eq!(update.attempts, 2);
        assert_eq!(update.last_order_id.as_deref(), Some("ord-1"));
        assert_eq!(update.last_order_status.as_deref(), Some("canceled"));
        assert_eq!(update.status, PendingSpreadStatus::Pending);
    }

    #[test]
    fn failed_update_records_error() {
        let update = PendingSpreadUpdate::next_attempt(&row(), Utc::now()).failed("wrong kind");
        assert_eq!(update.status, PendingSpreadStatus::Failed);
        assert_eq!(update.last_error.as_deref(), Some("wrong kind"));
    }

    #[test]
    fn decodes_snapshot() {
        let rec = row().decode_recommendation().unwrap();
        assert_eq!(rec.kind(), "option_vertical_spread");
    }
}
