//! Brokerage contract consumed by the executors.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{
    CalendarDay, ChainFilter, LatestTrade, MarketClock, OptionSnapshot, Order, OrderRequest,
    Position,
};

/// Operations the execution layer needs from a brokerage.
///
/// Implementations are injected into each component at construction; the
/// process boundary owns their lifecycle.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Submits an order and returns its initial state.
    async fn create_order(&self, request: &OrderRequest) -> Result<Order>;

    /// Reads the current state of an order.
    async fn get_order(&self, order_id: &str) -> Result<Order>;

    /// Requests cancellation. Success means the request was accepted, not
    /// that the order is already canceled.
    async fn cancel_order(&self, order_id: &str) -> Result<()>;

    /// All open positions.
    async fn get_positions(&self) -> Result<Vec<Position>>;

    /// Quoted contracts for an underlying, narrowed by `filter`.
    async fn get_option_chain(
        &self,
        underlying: &str,
        filter: &ChainFilter,
    ) -> Result<Vec<OptionSnapshot>>;

    /// Last trade print for a stock.
    async fn get_latest_trade(&self, symbol: &str) -> Result<LatestTrade>;

    /// Current trading clock.
    async fn get_clock(&self) -> Result<MarketClock>;

    /// Trading sessions between `start` and `end`, inclusive.
    async fn get_calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarDay>>;
}
