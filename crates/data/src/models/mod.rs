//! Data models for the trade desk.
//!
//! All models use `rust_decimal::Decimal` for financial precision.
//! Models derive `sqlx::FromRow` for database compatibility.

pub mod order_history;
pub mod pending_spread;
pub mod report;

pub use order_history::{AssetClass, NewOrderRecord, OrderHistoryRecord};
pub use pending_spread::{
    NewPendingSpread, PendingSpreadRecord, PendingSpreadStatus, PendingSpreadUpdate,
};
pub use report::MarketReportRecord;
