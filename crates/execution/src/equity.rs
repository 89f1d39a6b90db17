//! Single-leg stock orders against the equity budget.
//!
//! Buys are sized by notional and any failure to fill aborts the run. Sells
//! are sized from the held position; precondition failures skip the item.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use trade_desk_alpaca::{
    wait_for_terminal, BrokerClient, Order, OrderRequest, PollConfig, PollOutcome, Position,
};
use trade_desk_core::StockRecommendation;

use crate::allocation::{notional_for, sell_quantity, SellSizing};
use crate::error::{ExecutionError, Result};
use crate::types::SkippedItem;

/// Result of one sell recommendation.
#[derive(Debug, Clone, PartialEq)]
pub enum SellResult {
    Filled(Order),
    Skipped(SkippedItem),
}

pub struct EquityExecutor {
    broker: Arc<dyn BrokerClient>,
    budget: Decimal,
    poll: PollConfig,
    sell_qty_decimals: u32,
}

impl EquityExecutor {
    pub fn new(broker: Arc<dyn BrokerClient>, budget: Decimal, poll: PollConfig) -> Self {
        Self {
            broker,
            budget,
            poll,
            sell_qty_decimals: 4,
        }
    }

    #[must_use]
    pub fn with_sell_qty_decimals(mut self, decimals: u32) -> Self {
        self.sell_qty_decimals = decimals;
        self
    }

    /// Buys `allocation_percent` of the equity budget and waits for the fill.
    ///
    /// # Errors
    /// Any submission error, non-fill terminal status or timeout.
    pub async fn buy(&self, rec: &StockRecommendation) -> Result<Order> {
        let notional = notional_for(self.budget, rec.allocation_percent);
        let order = self
            .broker
            .create_order(&OrderRequest::market_notional_buy(&rec.ticker, notional))
            .await?;
        info!(order_id = %order.id, ticker = %rec.ticker, %notional, "Buy order submitted");

        self.await_fill(order).await
    }

    /// Sells `allocation_percent` of the held position in `rec.ticker`.
    ///
    /// # Errors
    /// Submission errors, non-fill terminal statuses and timeouts. Missing
    /// positions and bad allocations are skips, not errors.
    pub async fn sell(&self, rec: &StockRecommendation, positions: &[Position]) -> Result<SellResult> {
        let held = positions
            .iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(&rec.ticker))
            .map_or(Decimal::ZERO, |p| p.qty);

        let qty = match sell_quantity(held, rec.allocation_percent, self.sell_qty_decimals) {
            SellSizing::Quantity(qty) => qty,
            SellSizing::NoPosition => return Ok(skip(rec, "no position held".to_string())),
            SellSizing::InvalidAllocation(pct) => {
                return Ok(skip(rec, format!("allocation {pct} outside (0, 100]")))
            }
            SellSizing::ZeroQuantity => {
                return Ok(skip(rec, format!("computed quantity is zero (held {held})")))
            }
        };

        let order = self
            .broker
            .create_order(&OrderRequest::market_qty_sell(&rec.ticker, qty))
            .await?;
        info!(order_id = %order.id, ticker = %rec.ticker, %qty, "Sell order submitted");

        self.await_fill(order).await.map(SellResult::Filled)
    }

    async fn await_fill(&self, order: Order) -> Result<Order> {
        match wait_for_terminal(self.broker.as_ref(), &order.id, self.poll).await? {
            PollOutcome::Filled(filled) => {
                info!(
                    order_id = %filled.id,
                    filled_qty = %filled.filled_qty,
                    avg_price = ?filled.filled_avg_price,
                    "Equity order filled"
                );
                Ok(filled)
            }
            PollOutcome::Terminal(done) => {
                error!(order_id = %done.id, status = %done.status, "Equity order not filled");
                Err(ExecutionError::OrderNotFilled {
                    order_id: done.id,
                    status: done.status,
                })
            }
            PollOutcome::TimedOut { last } => {
                let last_status = last.map(|o| o.status);
                error!(order_id = %order.id, ?last_status, "Equity order wait timed out");
                Err(ExecutionError::OrderTimedOut {
                    order_id: order.id,
                    last_status,
                })
            }
        }
    }
}

fn skip(rec: &StockRecommendation, reason: String) -> SellResult {
    warn!(ticker = %rec.ticker, %reason, "Skipping sell");
    SellResult::Skipped(SkippedItem {
        ticker: rec.ticker.clone(),
        reason,
    })
}
