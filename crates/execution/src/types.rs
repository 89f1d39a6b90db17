//! Selection, outcome and summary types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use trade_desk_alpaca::{
    parse_option_symbol, OptionSnapshot, Order, OrderStatus, SymbolParseError,
};
use trade_desk_core::OptionType;
use trade_desk_data::{AssetClass, NewOrderRecord};

// =============================================================================
// Selection
// =============================================================================

/// A decoded, quoted option contract considered for a spread leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCandidate {
    pub symbol: String,
    pub underlying: String,
    pub expiration: NaiveDate,
    pub strike: Decimal,
    pub option_type: OptionType,
    pub bid: Decimal,
    pub ask: Decimal,
    pub mid: Decimal,
}

impl OptionCandidate {
    /// Decodes a chain listing.
    ///
    /// # Errors
    /// Returns `SymbolParseError` if the listing symbol is not OCC formatted.
    pub fn from_snapshot(snapshot: &OptionSnapshot) -> Result<Self, SymbolParseError> {
        let parsed = parse_option_symbol(&snapshot.symbol)?;
        Ok(Self {
            symbol: snapshot.symbol.clone(),
            underlying: parsed.underlying,
            expiration: parsed.expiration,
            strike: parsed.strike,
            option_type: parsed.option_type,
            bid: snapshot.bid,
            ask: snapshot.ask,
            mid: (snapshot.bid + snapshot.ask) / Decimal::TWO,
        })
    }

    /// Bid plus ask; used to pick between listings sharing a strike.
    #[must_use]
    pub fn quote_weight(&self) -> Decimal {
        self.bid + self.ask
    }
}

/// Long and short legs of a debit vertical plus the limit price per share.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalSelection {
    pub long_leg: OptionCandidate,
    pub short_leg: OptionCandidate,
    pub limit_debit: Decimal,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of one spread attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SpreadOutcome {
    Filled {
        order: Order,
        selection: VerticalSelection,
        contracts: u32,
    },
    /// Submitted but not filled inside the wait window. `order_id` is `None`
    /// when the submission failed in a way that may still have reached the
    /// brokerage.
    Pending {
        order_id: Option<String>,
        last_status: Option<OrderStatus>,
        reason: String,
        selection: VerticalSelection,
        contracts: u32,
    },
    /// Never submitted, or the submission was definitively refused.
    Skipped { reason: String },
}

impl SpreadOutcome {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Filled { .. } => "filled",
            Self::Pending { .. } => "pending",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Result of a triggered entry point: either it ran, or a gate turned it into
/// a no-op.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome<T> {
    Completed(T),
    Skipped { reason: String },
}

impl<T> RunOutcome<T> {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

// =============================================================================
// Summaries
// =============================================================================

/// Filled order as reported back to the trigger caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: String,
    pub symbols: Vec<String>,
    pub side: Option<String>,
    pub status: String,
    pub filled_qty: Decimal,
    pub filled_avg_price: Option<Decimal>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            symbols: order.symbols.clone(),
            side: order.side.map(|s| s.as_str().to_string()),
            status: order.status.to_string(),
            filled_qty: order.filled_qty,
            filled_avg_price: order.filled_avg_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub ticker: String,
    pub reason: String,
}

/// One spread's result in a run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadSummary {
    pub underlying: String,
    pub result: &'static str,
    pub order_id: Option<String>,
    pub broker_status: Option<String>,
    pub contracts: Option<u32>,
    pub limit_debit: Option<Decimal>,
    pub reason: Option<String>,
}

impl SpreadSummary {
    #[must_use]
    pub fn from_outcome(underlying: &str, outcome: &SpreadOutcome) -> Self {
        let mut summary = Self {
            underlying: underlying.to_string(),
            result: outcome.label(),
            order_id: None,
            broker_status: None,
            contracts: None,
            limit_debit: None,
            reason: None,
        };
        match outcome {
            SpreadOutcome::Filled {
                order,
                selection,
                contracts,
            } => {
                summary.order_id = Some(order.id.clone());
                summary.broker_status = Some(order.status.to_string());
                summary.contracts = Some(*contracts);
                summary.limit_debit = Some(selection.limit_debit);
            }
            SpreadOutcome::Pending {
                order_id,
                last_status,
                reason,
                selection,
                contracts,
            } => {
                summary.order_id.clone_from(order_id);
                summary.broker_status = last_status.map(|s| s.to_string());
                summary.contracts = Some(*contracts);
                summary.limit_debit = Some(selection.limit_debit);
                summary.reason = Some(reason.clone());
            }
            SpreadOutcome::Skipped { reason } => summary.reason = Some(reason.clone()),
        }
        summary
    }
}

/// What a purchase run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub report_id: i64,
    pub equity_orders: Vec<OrderSummary>,
    pub skipped_sells: Vec<SkippedItem>,
    pub spreads: Vec<SpreadSummary>,
}

impl RunSummary {
    #[must_use]
    pub fn new(report_id: i64) -> Self {
        Self {
            report_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn spread_count(&self, result: &str) -> usize {
        self.spreads.iter().filter(|s| s.result == result).count()
    }
}

/// What a retry batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySummary {
    pub report_id: i64,
    pub fetched: usize,
    pub filled: usize,
    pub still_pending: usize,
    pub skipped: usize,
    pub marked_failed: usize,
    pub deleted: usize,
    /// Rows were left untouched because the time budget ran out.
    pub budget_exhausted: bool,
}

/// Order history row for a filled order.
#[must_use]
pub fn order_record(report_id: i64, order: &Order, asset_class: AssetClass) -> NewOrderRecord {
    NewOrderRecord {
        report_id,
        broker_order_id: order.id.clone(),
        asset_class,
        symbols: order.symbols.clone(),
        side: order.side.map(|s| s.as_str().to_string()),
        quantity: order.qty,
        notional: order.notional,
        limit_price: order.limit_price,
        status: order.status.to_string(),
        filled_qty: order.filled_qty,
        filled_avg_price: order.filled_avg_price,
        submitted_at: order.submitted_at,
        filled_at: order.filled_at,
    }
}
