//! Data models for the Alpaca brokerage integration.
//!
//! All monetary values and quantities use `rust_decimal::Decimal`. Alpaca
//! transports decimals as JSON strings; requests are serialised the same way.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trade_desk_core::OptionType;

// =============================================================================
// Order Types
// =============================================================================

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
}

/// Order class. Only multi-leg orders carry one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderClass {
    Simple,
    Mleg,
}

/// Intent of an option leg relative to the existing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionIntent {
    BuyToOpen,
    SellToOpen,
    BuyToClose,
    SellToClose,
}

/// Brokerage order status.
///
/// Statuses not known to this crate decode to [`OrderStatus::Unknown`],
/// which is treated as still working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    DoneForDay,
    Canceled,
    Expired,
    Replaced,
    PendingCancel,
    PendingReplace,
    PendingNew,
    Accepted,
    AcceptedForBidding,
    Stopped,
    Rejected,
    Suspended,
    Calculated,
    Held,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Returns true if no further transition will occur.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled
                | Self::Canceled
                | Self::Expired
                | Self::Replaced
                | Self::PendingCancel
                | Self::Stopped
                | Self::Rejected
                | Self::Suspended
                | Self::Calculated
        )
    }

    #[must_use]
    pub fn is_filled(self) -> bool {
        self == Self::Filled
    }

    /// Wire name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::DoneForDay => "done_for_day",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Replaced => "replaced",
            Self::PendingCancel => "pending_cancel",
            Self::PendingReplace => "pending_replace",
            Self::PendingNew => "pending_new",
            Self::Accepted => "accepted",
            Self::AcceptedForBidding => "accepted_for_bidding",
            Self::Stopped => "stopped",
            Self::Rejected => "rejected",
            Self::Suspended => "suspended",
            Self::Calculated => "calculated",
            Self::Held => "held",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One leg of a multi-leg order request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLeg {
    pub symbol: String,
    pub ratio_qty: Decimal,
    pub side: OrderSide,
    pub position_intent: PositionIntent,
}

/// Order submission payload.
///
/// Build with the constructors rather than by hand; each produces one of the
/// three shapes this system submits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notional: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<OrderSide>,

    #[serde(rename = "type")]
    pub order_type: OrderType,

    pub time_in_force: TimeInForce,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_class: Option<OrderClass>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legs: Vec<OrderLeg>,
}

impl OrderRequest {
    /// Market buy sized by dollar amount.
    pub fn market_notional_buy(symbol: impl Into<String>, notional: Decimal) -> Self {
        Self {
            symbol: Some(symbol.into()),
            qty: None,
            notional: Some(notional),
            side: Some(OrderSide::Buy),
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
            limit_price: None,
            order_class: None,
            legs: Vec::new(),
        }
    }

    /// Market sell sized by share quantity.
    pub fn market_qty_sell(symbol: impl Into<String>, qty: Decimal) -> Self {
        Self {
            symbol: Some(symbol.into()),
            qty: Some(qty),
            notional: None,
            side: Some(OrderSide::Sell),
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
            limit_price: None,
            order_class: None,
            legs: Vec::new(),
        }
    }

    /// Two-leg debit limit order: buy the long leg, sell the short leg.
    pub fn vertical_spread_limit(
        long_symbol: impl Into<String>,
        short_symbol: impl Into<String>,
        contracts: u32,
        limit_debit: Decimal,
    ) -> Self {
        Self {
            symbol: None,
            qty: Some(Decimal::from(contracts)),
            notional: None,
            side: None,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Day,
            limit_price: Some(limit_debit),
            order_class: Some(OrderClass::Mleg),
            legs: vec![
                OrderLeg {
                    symbol: long_symbol.into(),
                    ratio_qty: Decimal::ONE,
                    side: OrderSide::Buy,
                    position_intent: PositionIntent::BuyToOpen,
                },
                OrderLeg {
                    symbol: short_symbol.into(),
                    ratio_qty: Decimal::ONE,
                    side: OrderSide::Sell,
                    position_intent: PositionIntent::SellToOpen,
                },
            ],
        }
    }

    /// Every symbol the order touches, legs first for multi-leg orders.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        if self.legs.is_empty() {
            self.symbol.iter().cloned().collect()
        } else {
            self.legs.iter().map(|l| l.symbol.clone()).collect()
        }
    }
}

/// Order as reported by the brokerage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Broker-assigned order ID.
    pub id: String,

    /// Symbols traded; one per leg for multi-leg orders.
    pub symbols: Vec<String>,

    /// Side for single-leg orders.
    pub side: Option<OrderSide>,

    pub qty: Option<Decimal>,
    pub notional: Option<Decimal>,
    pub limit_price: Option<Decimal>,

    pub status: OrderStatus,

    pub filled_qty: Decimal,
    pub filled_avg_price: Option<Decimal>,

    pub created_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.status.is_filled()
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// =============================================================================
// Account Types
// =============================================================================

/// Held position in a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub qty: Decimal,
}

// =============================================================================
// Market Data Types
// =============================================================================

/// Latest quote for one listed option contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSnapshot {
    /// OCC symbol of the contract.
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
}

/// Filters for an option chain lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainFilter {
    pub expiration: Option<NaiveDate>,
    pub option_type: Option<OptionType>,
    pub strike_min: Option<Decimal>,
    pub strike_max: Option<Decimal>,
}

impl ChainFilter {
    #[must_use]
    pub fn with_expiration(mut self, expiration: NaiveDate) -> Self {
        self.expiration = Some(expiration);
        self
    }

    #[must_use]
    pub fn with_option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = Some(option_type);
        self
    }

    #[must_use]
    pub fn with_strike_range(mut self, min: Decimal, max: Decimal) -> Self {
        self.strike_min = Some(min);
        self.strike_max = Some(max);
        self
    }
}

/// Last trade print for a stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestTrade {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Trading clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketClock {
    pub is_open: bool,
    pub timestamp: Option<DateTime<Utc>>,
    pub next_open: Option<DateTime<Utc>>,
    pub next_close: Option<DateTime<Utc>>,
}

/// One trading session from the market calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// Session open, exchange local time (e.g. "09:30").
    pub open: String,
    /// Session close, exchange local time (e.g. "16:00").
    pub close: String,
}
