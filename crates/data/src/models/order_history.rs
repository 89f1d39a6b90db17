//! Filled order history model.
//!
//! Orders are mirrored locally only after a terminal `filled` read. The
//! presence of any row for a report is the idempotency marker for catch-up
//! runs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Asset class of a recorded order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    OptionSpread,
}

impl AssetClass {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::OptionSpread => "option_spread",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "equity" => Some(Self::Equity),
            "option_spread" => Some(Self::OptionSpread),
            _ => None,
        }
    }
}

/// A persisted filled order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderHistoryRecord {
    pub id: i64,
    pub report_id: i64,
    pub broker_order_id: String,
    /// "equity" or "option_spread".
    pub asset_class: String,
    /// Traded symbols; one per leg for spreads.
    pub symbols: Vec<String>,
    pub side: Option<String>,
    pub quantity: Option<Decimal>,
    pub notional: Option<Decimal>,
    pub limit_price: Option<Decimal>,
    pub status: String,
    pub filled_qty: Decimal,
    pub filled_avg_price: Option<Decimal>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub recorded_at: DateTime<Utc>,
}

/// Values for a new order history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderRecord {
    pub report_id: i64,
    pub broker_order_id: String,
    pub asset_class: AssetClass,
    pub symbols: Vec<String>,
    pub side: Option<String>,
    pub quantity: Option<Decimal>,
    pub notional: Option<Decimal>,
    pub limit_price: Option<Decimal>,
    pub status: String,
    pub filled_qty: Decimal,
    pub filled_avg_price: Option<Decimal>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
}
