//! Alpaca brokerage integration for the trade desk.
//!
//! This crate provides:
//! - The [`BrokerClient`] contract the executors are written against
//! - A rate-limited REST client for Alpaca trading and market data APIs
//! - Order, position, option chain and market clock models
//! - OCC option symbol decoding
//! - A poll-until-terminal primitive for order status
//! - A scripted [`MockBroker`] for tests
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use rust_decimal_macros::dec;
//! use trade_desk_alpaca::{
//!     wait_for_terminal, AlpacaClient, AlpacaClientConfig, BrokerClient, OrderRequest,
//!     PollConfig, PollOutcome,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = AlpacaClient::new(AlpacaClientConfig::paper())?;
//!
//!     let order = client
//!         .create_order(&OrderRequest::market_notional_buy("AAPL", dec!(250)))
//!         .await?;
//!
//!     let poll = PollConfig::new(Duration::from_secs(2), Duration::from_secs(120));
//!     match wait_for_terminal(&client, &order.id, poll).await? {
//!         PollOutcome::Filled(order) => println!("filled {}", order.filled_qty),
//!         other => println!("not filled: {:?}", other.last_status()),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Authentication
//!
//! Set the following environment variables:
//!
//! - `APCA_API_KEY_ID`: API key ID
//! - `APCA_API_SECRET_KEY`: API secret key
//!
//! # API Endpoints
//!
//! - `POST /v2/orders` - Submit order
//! - `GET /v2/orders/{order_id}` - Get order status
//! - `DELETE /v2/orders/{order_id}` - Cancel order
//! - `GET /v2/positions` - Get positions
//! - `GET /v2/clock` - Market clock
//! - `GET /v2/calendar` - Trading sessions
//! - `GET /v2/stocks/{symbol}/trades/latest` - Latest trade
//! - `GET /v1beta1/options/snapshots/{underlying}` - Option chain quotes

pub mod auth;
pub mod broker;
pub mod client;
pub mod error;
pub mod mock;
pub mod poll;
pub mod symbol;
pub mod types;

// Re-export main types for convenience
pub use auth::{AlpacaAuthConfig, AlpacaCredentials};
pub use broker::BrokerClient;
pub use client::{
    AlpacaClient, AlpacaClientConfig, ALPACA_DATA_URL, ALPACA_LIVE_URL, ALPACA_PAPER_URL,
};
pub use error::{BrokerError, Result, SymbolParseError};
pub use mock::{MockBroker, MockCall, StatusStep};
pub use poll::{wait_for_terminal, PollConfig, PollOutcome};
pub use symbol::{format_option_symbol, parse_option_symbol, ParsedOptionSymbol};
pub use types::{
    CalendarDay, ChainFilter, LatestTrade, MarketClock, OptionSnapshot, Order, OrderLeg,
    OrderRequest, OrderSide, OrderStatus, Position,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_exports() {
        let _ = AlpacaAuthConfig::default();
        let _ = AlpacaClientConfig::default();
        let _ = ChainFilter::default();
        let _ = MockBroker::default();
    }

    #[test]
    fn test_constants_accessible() {
        assert!(ALPACA_PAPER_URL.starts_with("https://"));
        assert!(ALPACA_LIVE_URL.starts_with("https://"));
        assert!(ALPACA_DATA_URL.starts_with("https://"));
    }
}
