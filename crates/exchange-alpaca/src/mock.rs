//! Scripted in-process brokerage for tests and dry runs.
//!
//! `MockBroker` assigns sequential order IDs, plays back a status script per
//! submitted order, and records every call so tests can assert on what was
//! (or was not) sent.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::broker::BrokerClient;
use crate::error::{BrokerError, Result};
use crate::symbol::parse_option_symbol;
use crate::types::{
    CalendarDay, ChainFilter, LatestTrade, MarketClock, OptionSnapshot, Order, OrderRequest,
    OrderStatus, Position,
};

/// One scripted response to `get_order`.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusStep {
    Status(OrderStatus),
    /// Network failure; pollers should keep going.
    TransientError,
    /// Non-retryable API failure.
    FatalError,
}

/// Brokerage call kinds, in the order they were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CreateOrder,
    GetOrder(String),
    CancelOrder(String),
    GetPositions,
    GetOptionChain(String),
    GetLatestTrade(String),
    GetClock,
    GetCalendar,
}

#[derive(Debug)]
struct TrackedOrder {
    request: OrderRequest,
    script: VecDeque<StatusStep>,
    last_status: OrderStatus,
}

#[derive(Debug)]
struct MockState {
    next_id: u64,
    orders: HashMap<String, TrackedOrder>,
    default_script: Vec<StatusStep>,
    queued_scripts: VecDeque<Vec<StatusStep>>,
    create_failures: VecDeque<BrokerError>,
    fail_cancel: bool,
    positions: Vec<Position>,
    prices: HashMap<String, Decimal>,
    chains: HashMap<String, Vec<OptionSnapshot>>,
    clock_open: bool,
    sessions: Vec<CalendarDay>,
    calls: Vec<MockCall>,
    submitted: Vec<OrderRequest>,
    chain_filters: Vec<ChainFilter>,
}

/// Scripted brokerage.
#[derive(Debug)]
pub struct MockBroker {
    state: Mutex<MockState>,
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBroker {
    /// Creates a broker whose orders fill on the first read and whose market is open.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1,
                orders: HashMap::new(),
                default_script: vec![StatusStep::Status(OrderStatus::Filled)],
                queued_scripts: VecDeque::new(),
                create_failures: VecDeque::new(),
                fail_cancel: false,
                positions: Vec::new(),
                prices: HashMap::new(),
                chains: HashMap::new(),
                clock_open: true,
                sessions: Vec::new(),
                calls: Vec::new(),
                submitted: Vec::new(),
                chain_filters: Vec::new(),
            }),
        }
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Status script used for every order without a queued script. The last
    /// step repeats once the script is exhausted.
    #[must_use]
    pub fn with_order_script(self, steps: Vec<StatusStep>) -> Self {
        self.state.lock().default_script = steps;
        self
    }

    /// Script for the next submitted order only.
    #[must_use]
    pub fn with_next_order_script(self, steps: Vec<StatusStep>) -> Self {
        self.state.lock().queued_scripts.push_back(steps);
        self
    }

    /// Makes the next `create_order` call fail with `error`.
    #[must_use]
    pub fn with_create_failure(self, error: BrokerError) -> Self {
        self.state.lock().create_failures.push_back(error);
        self
    }

    /// Makes every `cancel_order` call fail.
    #[must_use]
    pub fn with_cancel_failure(self) -> Self {
        self.state.lock().fail_cancel = true;
        self
    }

    #[must_use]
    pub fn with_position(self, symbol: &str, qty: Decimal) -> Self {
        self.state.lock().positions.push(Position {
            symbol: symbol.to_string(),
            qty,
        });
        self
    }

    #[must_use]
    pub fn with_price(self, symbol: &str, price: Decimal) -> Self {
        self.state.lock().prices.insert(symbol.to_string(), price);
        self
    }

    /// Adds a quoted contract to the chain of its underlying.
    #[must_use]
    pub fn with_option(self, symbol: &str, bid: Decimal, ask: Decimal) -> Self {
        let underlying = parse_option_symbol(symbol)
            .map(|p| p.underlying)
            .unwrap_or_else(|_| symbol.to_string());
        self.with_listing(&underlying, symbol, bid, ask)
    }

    /// Adds a listing under `underlying` verbatim, even if `symbol` is not a
    /// valid OCC symbol.
    #[must_use]
    pub fn with_listing(self, underlying: &str, symbol: &str, bid: Decimal, ask: Decimal) -> Self {
        self.state
            .lock()
            .chains
            .entry(underlying.to_string())
            .or_default()
            .push(OptionSnapshot {
                symbol: symbol.to_string(),
                bid,
                ask,
            });
        self
    }

    #[must_use]
    pub fn with_market_open(self, is_open: bool) -> Self {
        self.state.lock().clock_open = is_open;
        self
    }

    /// Adds a trading session to the calendar.
    #[must_use]
    pub fn with_session(self, date: NaiveDate) -> Self {
        self.state.lock().sessions.push(CalendarDay {
            date,
            open: "09:30".to_string(),
            close: "16:00".to_string(),
        });
        self
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Requests passed to successful `create_order` calls.
    #[must_use]
    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().submitted.clone()
    }

    #[must_use]
    pub fn canceled_orders(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::CancelOrder(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn get_order_calls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::GetOrder(_)))
            .count()
    }

    /// Filters passed to `get_option_chain`, in call order.
    #[must_use]
    pub fn chain_filters(&self) -> Vec<ChainFilter> {
        self.state.lock().chain_filters.clone()
    }

    fn order_view(id: &str, tracked: &TrackedOrder, status: OrderStatus, price: Decimal) -> Order {
        let now = Utc::now();
        let filled = status.is_filled();
        let filled_qty = match (filled, tracked.request.qty, tracked.request.notional) {
            (false, _, _) => Decimal::ZERO,
            (true, Some(qty), _) => qty,
            (true, None, Some(notional)) if !price.is_zero() => {
                (notional / price).round_dp(9)
            }
            (true, None, _) => Decimal::ZERO,
        };
        let avg_price = tracked.request.limit_price.unwrap_or(price);

        Order {
            id: id.to_string(),
            symbols: tracked.request.symbols(),
            side: tracked.request.side,
            qty: tracked.request.qty,
            notional: tracked.request.notional,
            limit_price: tracked.request.limit_price,
            status,
            filled_qty,
            filled_avg_price: filled.then_some(avg_price),
            created_at: Some(now),
            submitted_at: Some(now),
            filled_at: filled.then_some(now),
            expired_at: None,
        }
    }
}

fn chain_matches(filter: &ChainFilter, snapshot: &OptionSnapshot) -> bool {
    let Ok(parsed) = parse_option_symbol(&snapshot.symbol) else {
        return true;
    };
    filter.expiration.map_or(true, |e| e == parsed.expiration)
        && filter.option_type.map_or(true, |t| t == parsed.option_type)
        && filter.strike_min.map_or(true, |m| parsed.strike >= m)
        && filter.strike_max.map_or(true, |m| parsed.strike <= m)
}

#[async_trait]
impl BrokerClient for MockBroker {
    async fn create_order(&self, request: &OrderRequest) -> Result<Order> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::CreateOrder);

        if let Some(err) = state.create_failures.pop_front() {
            return Err(err);
        }

        let id = format!("mock-order-{}", state.next_id);
        state.next_id += 1;

        let script = state
            .queued_scripts
            .pop_front()
            .unwrap_or_else(|| state.default_script.clone());
        let tracked = TrackedOrder {
            request: request.clone(),
            script: script.into(),
            last_status: OrderStatus::New,
        };
        let order = Self::order_view(&id, &tracked, OrderStatus::New, dec!(0));

        state.submitted.push(request.clone());
        state.orders.insert(id, tracked);
        Ok(order)
    }

    async fn get_order(&self, order_id: &str) -> Result<Order> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::GetOrder(order_id.to_string()));

        let price = state
            .orders
            .get(order_id)
            .and_then(|t| t.request.symbol.as_ref())
            .and_then(|s| state.prices.get(s).copied())
            .unwrap_or(dec!(100));

        let tracked = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| BrokerError::order_not_found(order_id))?;

        let step = if tracked.script.len() > 1 {
            tracked.script.pop_front()
        } else {
            tracked.script.front().cloned()
        };

        match step.unwrap_or(StatusStep::Status(tracked.last_status)) {
            StatusStep::Status(status) => {
                tracked.last_status = status;
                Ok(Self::order_view(order_id, tracked, status, price))
            }
            StatusStep::TransientError => {
                Err(BrokerError::Network("connection reset by peer".to_string()))
            }
            StatusStep::FatalError => Err(BrokerError::api(422, "order is not accessible")),
        }
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::CancelOrder(order_id.to_string()));

        if state.fail_cancel {
            return Err(BrokerError::api(422, "order is not cancelable"));
        }
        let tracked = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| BrokerError::order_not_found(order_id))?;
        if tracked.last_status.is_terminal() {
            return Err(BrokerError::api(422, "order is not cancelable"));
        }

        // Accepted cancels settle on the next read.
        tracked.script = VecDeque::from([StatusStep::Status(OrderStatus::Canceled)]);
        Ok(())
    }

    async fn get_positions(&self) -> Result<Vec<Position>> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::GetPositions);
        Ok(state.positions.clone())
    }

    async fn get_option_chain(
        &self,
        underlying: &str,
        filter: &ChainFilter,
    ) -> Result<Vec<OptionSnapshot>> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::GetOptionChain(underlying.to_string()));
        state.chain_filters.push(filter.clone());

        Ok(state
            .chains
            .get(underlying)
            .map(|chain| {
                chain
                    .iter()
                    .filter(|s| chain_matches(filter, s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_latest_trade(&self, symbol: &str) -> Result<LatestTrade> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::GetLatestTrade(symbol.to_string()));

        let price = state
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| BrokerError::api(404, format!("no trades for {symbol}")))?;

        Ok(LatestTrade {
            symbol: symbol.to_string(),
            price,
            timestamp: Some(Utc::now()),
        })
    }

    async fn get_clock(&self) -> Result<MarketClock> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::GetClock);
        Ok(MarketClock {
            is_open: state.clock_open,
            timestamp: Some(Utc::now()),
            next_open: None,
            next_close: None,
        })
    }

    async fn get_calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarDay>> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::GetCalendar);
        Ok(state
            .sessions
            .iter()
            .filter(|d| d.date >= start && d.date <= end)
            .cloned()
            .collect())
    }
}
