//! Budgeted order execution for the trade desk.
//!
//! Turns a market report's recommendations into brokerage orders:
//!
//! - [`EquityExecutor`]: notional buys and quantity sells, polled to a fill
//! - [`select_spread`]: vertical spread leg selection from a live chain
//! - [`SpreadExecutor`]: two-leg limit orders that fill, go pending or skip
//! - [`PurchaseRunner`]: primary and catch-up runs over one report
//! - [`RetryScheduler`]: weekly re-drive of pending spreads
//! - [`TradeDesk`]: the entry points callers trigger

pub mod allocation;
pub mod equity;
pub mod error;
pub mod purchase;
pub mod retry;
pub mod selector;
pub mod service;
pub mod spread;
pub mod stores;
pub mod types;

pub use allocation::{
    affordable_contracts, contracts_to_buy, notional_for, sell_quantity, SellSizing,
    CONTRACT_MULTIPLIER,
};
pub use equity::{EquityExecutor, SellResult};
pub use error::{ExecutionError, Result};
pub use purchase::PurchaseRunner;
pub use retry::{in_retry_window, RetryScheduler};
pub use selector::{
    candidates_from_chain, choose_expiration, limit_debit, select_spread, select_vertical,
    strike_band, MIN_DEBIT,
};
pub use service::TradeDesk;
pub use spread::SpreadExecutor;
pub use stores::Stores;
pub use types::{
    order_record, OptionCandidate, OrderSummary, RetrySummary, RunOutcome, RunSummary,
    SkippedItem, SpreadOutcome, SpreadSummary, VerticalSelection,
};
