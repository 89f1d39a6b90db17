//! Alpaca REST API client with rate limiting.
//!
//! Trading calls (orders, positions, clock, calendar) go to the trading host;
//! quotes and option snapshots go to the market data host. All requests are
//! rate-limited with the governor crate and authenticated with the API key
//! headers.
//!
//! # Example
//!
//! ```ignore
//! use trade_desk_alpaca::{AlpacaClient, AlpacaClientConfig, BrokerClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = AlpacaClient::new(AlpacaClientConfig::paper())?;
//!
//!     let clock = client.get_clock().await?;
//!     println!("Market open: {}", clock.is_open);
//!
//!     let trade = client.get_latest_trade("SPY").await?;
//!     println!("SPY last: {}", trade.price);
//!
//!     Ok(())
//! }
//! ```

use crate::auth::{AlpacaAuthConfig, AlpacaCredentials};
use crate::broker::BrokerClient;
use crate::error::{BrokerError, Result};
use crate::types::{
    CalendarDay, ChainFilter, LatestTrade, MarketClock, OptionSnapshot, Order, OrderRequest,
    OrderSide, Position,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use trade_desk_core::BrokerConfig;

// =============================================================================
// Constants
// =============================================================================

/// Paper trading API base URL.
pub const ALPACA_PAPER_URL: &str = "https://paper-api.alpaca.markets";

/// Live trading API base URL.
pub const ALPACA_LIVE_URL: &str = "https://api.alpaca.markets";

/// Market data API base URL.
pub const ALPACA_DATA_URL: &str = "https://data.alpaca.markets";

/// Page size requested from the option snapshot endpoint.
const SNAPSHOT_PAGE_LIMIT: u32 = 1000;

/// Upper bound on snapshot pages followed for one chain lookup.
const MAX_SNAPSHOT_PAGES: usize = 50;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Alpaca client.
#[derive(Debug, Clone)]
pub struct AlpacaClientConfig {
    /// Base URL for trading endpoints.
    pub trading_url: String,

    /// Base URL for market data endpoints.
    pub data_url: String,

    /// Environment variable names for credentials.
    pub auth_config: AlpacaAuthConfig,

    /// Requests per minute limit.
    pub requests_per_minute: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AlpacaClientConfig {
    fn default() -> Self {
        Self {
            trading_url: ALPACA_PAPER_URL.to_string(),
            data_url: ALPACA_DATA_URL.to_string(),
            auth_config: AlpacaAuthConfig::default(),
            requests_per_minute: nonzero!(180u32),
            timeout_secs: 30,
        }
    }
}

impl AlpacaClientConfig {
    /// Creates a configuration for paper trading.
    #[must_use]
    pub fn paper() -> Self {
        Self::default()
    }

    /// Creates a configuration for live trading.
    #[must_use]
    pub fn live() -> Self {
        Self {
            trading_url: ALPACA_LIVE_URL.to_string(),
            ..Default::default()
        }
    }

    /// Builds a client configuration from the application's broker section.
    #[must_use]
    pub fn from_broker_config(config: &BrokerConfig) -> Self {
        Self {
            trading_url: config.trading_url.clone(),
            data_url: config.data_url.clone(),
            requests_per_minute: NonZeroU32::new(config.requests_per_minute)
                .unwrap_or(nonzero!(180u32)),
            timeout_secs: config.timeout_secs,
            ..Default::default()
        }
    }

    /// Sets both base URLs (useful for testing against a single mock server).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.trading_url = url.clone();
        self.data_url = url;
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: NonZeroU32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct RawLeg {
    symbol: String,
}

/// Raw order as returned by the trading API.
#[derive(Debug, Clone, Deserialize)]
struct RawOrder {
    id: String,
    symbol: Option<String>,
    side: Option<String>,
    qty: Option<Decimal>,
    notional: Option<Decimal>,
    limit_price: Option<Decimal>,
    status: crate::types::OrderStatus,
    filled_qty: Option<Decimal>,
    filled_avg_price: Option<Decimal>,
    created_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
    filled_at: Option<DateTime<Utc>>,
    expired_at: Option<DateTime<Utc>>,
    legs: Option<Vec<RawLeg>>,
}

impl From<RawOrder> for Order {
    fn from(raw: RawOrder) -> Self {
        let side = match raw.side.as_deref() {
            Some("buy") => Some(OrderSide::Buy),
            Some("sell") => Some(OrderSide::Sell),
            _ => None,
        };

        let symbols = match raw.legs {
            Some(legs) if !legs.is_empty() => legs.into_iter().map(|l| l.symbol).collect(),
            _ => raw.symbol.into_iter().filter(|s| !s.is_empty()).collect(),
        };

        Self {
            id: raw.id,
            symbols,
            side,
            qty: raw.qty,
            notional: raw.notional,
            limit_price: raw.limit_price,
            status: raw.status,
            filled_qty: raw.filled_qty.unwrap_or_default(),
            filled_avg_price: raw.filled_avg_price,
            created_at: raw.created_at,
            submitted_at: raw.submitted_at,
            filled_at: raw.filled_at,
            expired_at: raw.expired_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawQuote {
    bp: Option<Decimal>,
    ap: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSnapshot {
    #[serde(rename = "latestQuote")]
    latest_quote: Option<RawQuote>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSnapshotsResponse {
    #[serde(default)]
    snapshots: BTreeMap<String, RawSnapshot>,
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTrade {
    p: Decimal,
    t: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawLatestTradeResponse {
    symbol: Option<String>,
    trade: RawTrade,
}

// =============================================================================
// AlpacaClient
// =============================================================================

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Alpaca REST API client.
pub struct AlpacaClient {
    config: AlpacaClientConfig,
    http: Client,
    rate_limiter: Arc<DirectRateLimiter>,
    credentials: AlpacaCredentials,
}

impl std::fmt::Debug for AlpacaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClient")
            .field("trading_url", &self.config.trading_url)
            .field("data_url", &self.config.data_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl AlpacaClient {
    /// Creates a new client, loading credentials from the environment.
    ///
    /// # Errors
    /// Returns error if credentials are missing or the HTTP client cannot be built.
    pub fn new(config: AlpacaClientConfig) -> Result<Self> {
        let credentials = AlpacaCredentials::from_env(&config.auth_config)?;
        Self::with_credentials(config, credentials)
    }

    /// Creates a new client with explicit credentials.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_credentials(
        config: AlpacaClientConfig,
        credentials: AlpacaCredentials,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BrokerError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
            credentials,
        })
    }

    #[must_use]
    pub fn trading_url(&self) -> &str {
        &self.config.trading_url
    }

    #[must_use]
    pub fn data_url(&self) -> &str {
        &self.config.data_url
    }

    /// Validates an identifier (order ID, ticker) before it is placed in a URL path.
    fn validate_identifier(id: &str) -> Result<&str> {
        if id.contains("..") || id.contains('/') || id.contains('\\') {
            return Err(BrokerError::InvalidRequest(format!(
                "invalid identifier: contains forbidden characters: {id}"
            )));
        }

        if id.is_empty() {
            return Err(BrokerError::InvalidRequest(
                "identifier cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(BrokerError::InvalidRequest(format!(
                "invalid identifier: must contain only alphanumeric, hyphen, underscore or dot: {id}"
            )));
        }

        if id.len() > 128 {
            return Err(BrokerError::InvalidRequest(format!(
                "invalid identifier: exceeds maximum length of 128: {}",
                id.len()
            )));
        }

        Ok(id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        self.credentials
            .headers()
            .into_iter()
            .fold(request.header("Accept", "application/json"), |req, (name, value)| {
                req.header(name, value)
            })
    }

    /// Waits for rate limiter and makes an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{base}{path}");
        tracing::debug!("GET {} params={}", url, query.len());

        let response = self
            .authorize(self.http.get(&url))
            .query(query)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Waits for rate limiter and makes an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.trading_url, path);
        let body_json = serde_json::to_string(body)?;

        tracing::debug!("POST {} body_len={}", url, body_json.len());

        let response = self
            .authorize(self.http.post(&url))
            .header("Content-Type", "application/json")
            .body(body_json)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Waits for rate limiter and makes an authenticated DELETE request.
    async fn delete(&self, path: &str) -> Result<()> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.trading_url, path);
        tracing::debug!("DELETE {}", url);

        let response = self.authorize(self.http.delete(&url)).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(BrokerError::rate_limit(Self::retry_after(&response)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status.as_u16(), text));
        }

        Ok(())
    }

    fn retry_after(response: &reqwest::Response) -> u64 {
        response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60)
    }

    fn status_error(status: u16, text: String) -> BrokerError {
        match status {
            401 | 403 => BrokerError::Authentication(text),
            _ => BrokerError::api(status, text),
        }
    }

    /// Handles API response, converting errors appropriately.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(BrokerError::rate_limit(Self::retry_after(&response)));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status.as_u16(), text));
        }

        let body = response.json::<T>().await?;
        Ok(body)
    }

    fn chain_query(filter: &ChainFilter, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![("limit", SNAPSHOT_PAGE_LIMIT.to_string())];
        if let Some(option_type) = filter.option_type {
            query.push(("type", option_type.as_str().to_string()));
        }
        if let Some(expiration) = filter.expiration {
            query.push(("expiration_date", expiration.format("%Y-%m-%d").to_string()));
        }
        if let Some(min) = filter.strike_min {
            query.push(("strike_price_gte", min.to_string()));
        }
        if let Some(max) = filter.strike_max {
            query.push(("strike_price_lte", max.to_string()));
        }
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }
        query
    }
}

#[async_trait]
impl BrokerClient for AlpacaClient {
    // =========================================================================
    // Order Endpoints
    // =========================================================================

    async fn create_order(&self, request: &OrderRequest) -> Result<Order> {
        let raw: RawOrder = self.post("/v2/orders", request).await?;
        Ok(Order::from(raw))
    }

    async fn get_order(&self, order_id: &str) -> Result<Order> {
        let order_id = Self::validate_identifier(order_id)?;
        let path = format!("/v2/orders/{order_id}");

        match self.get::<RawOrder>(&self.config.trading_url, &path, &[]).await {
            Ok(raw) => Ok(Order::from(raw)),
            Err(BrokerError::Api {
                status_code: 404, ..
            }) => Err(BrokerError::order_not_found(order_id)),
            Err(e) => Err(e),
        }
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let order_id = Self::validate_identifier(order_id)?;
        let path = format!("/v2/orders/{order_id}");

        match self.delete(&path).await {
            Err(BrokerError::Api {
                status_code: 404, ..
            }) => Err(BrokerError::order_not_found(order_id)),
            other => other,
        }
    }

    // =========================================================================
    // Account Endpoints
    // =========================================================================

    async fn get_positions(&self) -> Result<Vec<Position>> {
        self.get(&self.config.trading_url, "/v2/positions", &[]).await
    }

    // =========================================================================
    // Market Data Endpoints
    // =========================================================================

    async fn get_option_chain(
        &self,
        underlying: &str,
        filter: &ChainFilter,
    ) -> Result<Vec<OptionSnapshot>> {
        let underlying = Self::validate_identifier(underlying)?;
        let path = format!("/v1beta1/options/snapshots/{underlying}");

        let mut snapshots = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_SNAPSHOT_PAGES {
            let query = Self::chain_query(filter, page_token.as_deref());
            let page: RawSnapshotsResponse = self.get(&self.config.data_url, &path, &query).await?;

            snapshots.extend(page.snapshots.into_iter().map(|(symbol, snap)| {
                let quote = snap.latest_quote;
                OptionSnapshot {
                    symbol,
                    bid: quote.as_ref().and_then(|q| q.bp).unwrap_or_default(),
                    ask: quote.as_ref().and_then(|q| q.ap).unwrap_or_default(),
                }
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(
            underlying = %underlying,
            contracts = snapshots.len(),
            "Fetched option chain"
        );

        Ok(snapshots)
    }

    async fn get_latest_trade(&self, symbol: &str) -> Result<LatestTrade> {
        let symbol = Self::validate_identifier(symbol)?;
        let path = format!("/v2/stocks/{symbol}/trades/latest");

        let raw: RawLatestTradeResponse = self.get(&self.config.data_url, &path, &[]).await?;

        Ok(LatestTrade {
            symbol: raw.symbol.unwrap_or_else(|| symbol.to_string()),
            price: raw.trade.p,
            timestamp: raw.trade.t,
        })
    }

    async fn get_clock(&self) -> Result<MarketClock> {
        self.get(&self.config.trading_url, "/v2/clock", &[]).await
    }

    async fn get_calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarDay>> {
        let query = [
            ("start", start.format("%Y-%m-%d").to_string()),
            ("end", end.format("%Y-%m-%d").to_string()),
        ];
        self.get(&self.config.trading_url, "/v2/calendar", &query).await
    }
}
