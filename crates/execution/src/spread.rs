//! Two-leg limit orders against the spread budget.
//!
//! A spread attempt ends in exactly one of three states. Data problems before
//! submission, or a definitive refusal, skip it. A fill inside the wait window
//! fills it. Anything else leaves it pending after a best-effort cancel, to be
//! retried later. A transient submission failure is pending with no order id,
//! since the brokerage may have accepted the order.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, warn};

use trade_desk_alpaca::{
    wait_for_terminal, BrokerClient, OrderRequest, PollConfig, PollOutcome,
};
use trade_desk_core::SpreadRecommendation;

use crate::allocation::{contracts_to_buy, CONTRACT_MULTIPLIER};
use crate::selector::select_spread;
use crate::types::SpreadOutcome;

pub struct SpreadExecutor {
    broker: Arc<dyn BrokerClient>,
    band_pct: Decimal,
    poll_interval: Duration,
}

impl SpreadExecutor {
    pub fn new(broker: Arc<dyn BrokerClient>, band_pct: Decimal, poll_interval: Duration) -> Self {
        Self {
            broker,
            band_pct,
            poll_interval,
        }
    }

    /// Selects, sizes, submits and waits up to `wait` for one spread.
    ///
    /// Never fails: every brokerage problem maps onto skipped or pending.
    pub async fn execute(
        &self,
        rec: &SpreadRecommendation,
        budget: Decimal,
        wait: Duration,
    ) -> SpreadOutcome {
        let ticker = rec.underlying_ticker.as_str();

        let spot = match self.broker.get_latest_trade(ticker).await {
            Ok(trade) if trade.price > Decimal::ZERO => trade.price,
            Ok(trade) => {
                return skipped(ticker, format!("no live price for {ticker} (last {})", trade.price))
            }
            Err(e) => return skipped(ticker, format!("no live price for {ticker}: {e}")),
        };

        let selection = match select_spread(self.broker.as_ref(), rec, spot, self.band_pct).await {
            Ok(Some(selection)) => selection,
            Ok(None) => {
                return skipped(ticker, format!("insufficient live option chain for {ticker}"))
            }
            Err(e) => return skipped(ticker, format!("option chain unavailable for {ticker}: {e}")),
        };

        let debit = selection.limit_debit;
        let contracts = contracts_to_buy(budget, debit, rec.contracts);
        if contracts < 1 {
            return skipped(
                ticker,
                format!(
                    "budget {budget} does not cover one contract at {} per contract",
                    debit * CONTRACT_MULTIPLIER
                ),
            );
        }

        let request = OrderRequest::vertical_spread_limit(
            &selection.long_leg.symbol,
            &selection.short_leg.symbol,
            contracts,
            debit,
        );
        let order = match self.broker.create_order(&request).await {
            Ok(order) => order,
            Err(e) if e.is_transient() => {
                let reason = format!("spread submission unconfirmed: {e}");
                warn!(ticker = %ticker, %reason, "Spread order pending");
                return SpreadOutcome::Pending {
                    order_id: None,
                    last_status: None,
                    reason,
                    selection,
                    contracts,
                };
            }
            Err(e) => return skipped(ticker, format!("spread submission refused: {e}")),
        };
        info!(
            order_id = %order.id,
            ticker = %ticker,
            long = %selection.long_leg.symbol,
            short = %selection.short_leg.symbol,
            contracts,
            limit_debit = %debit,
            "Spread order submitted"
        );

        let poll = PollConfig::new(self.poll_interval, wait);
        let (last_status, reason) =
            match wait_for_terminal(self.broker.as_ref(), &order.id, poll).await {
                Ok(PollOutcome::Filled(filled)) => {
                    info!(order_id = %filled.id, ticker = %ticker, contracts, "Spread order filled");
                    return SpreadOutcome::Filled {
                        order: filled,
                        selection,
                        contracts,
                    };
                }
                Ok(PollOutcome::Terminal(done)) => (
                    Some(done.status),
                    format!("order ended {} without filling", done.status),
                ),
                Ok(PollOutcome::TimedOut { last }) => (
                    Some(last.map_or(order.status, |o| o.status)),
                    format!("not filled within {}s", wait.as_secs()),
                ),
                Err(e) => (Some(order.status), format!("order status unavailable: {e}")),
            };

        if let Err(e) = self.broker.cancel_order(&order.id).await {
            warn!(order_id = %order.id, error = %e, "Failed to cancel unfilled spread order");
        }
        warn!(order_id = %order.id, ticker = %ticker, ?last_status, %reason, "Spread order pending");

        SpreadOutcome::Pending {
            order_id: Some(order.id),
            last_status,
            reason,
            selection,
            contracts,
        }
    }
}

fn skipped(ticker: &str, reason: String) -> SpreadOutcome {
    warn!(ticker = %ticker, %reason, "Skipping spread");
    SpreadOutcome::skipped(reason)
}
