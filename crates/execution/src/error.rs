//! Error type for purchase runs and retries.

use thiserror::Error;
use trade_desk_alpaca::{BrokerError, OrderStatus};
use trade_desk_core::BudgetInvariantError;

/// Failures that abort a purchase run or retry batch.
///
/// Per-item problems (a sell with no position, a spread with no usable chain)
/// are not errors; they are reported as skips in the run summary.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Recommendation budgets are inconsistent. Raised before any order is placed.
    #[error("validation failed: {0}")]
    Validation(#[from] BudgetInvariantError),

    /// An equity order reached a terminal status other than `filled`.
    #[error("order {order_id} ended with status {status}")]
    OrderNotFilled {
        order_id: String,
        status: OrderStatus,
    },

    /// An equity order was still working when its wait expired.
    #[error(
        "order {order_id} not terminal before timeout (last status: {})",
        .last_status.map_or("unknown", OrderStatus::as_str)
    )]
    OrderTimedOut {
        order_id: String,
        last_status: Option<OrderStatus>,
    },

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("store error: {0:#}")]
    Store(anyhow::Error),

    /// Stored report or row could not be decoded.
    #[error("invalid payload: {0}")]
    Payload(String),
}

impl ExecutionError {
    /// True for budget-invariant failures, which callers surface as client errors.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
