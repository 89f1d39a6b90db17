//! Poll-until-terminal primitive shared by the equity and spread executors.
//!
//! Reads the order once immediately, then at a fixed interval until it reaches
//! a terminal status or the timeout elapses. Timing goes through `tokio::time`
//! so tests can run on a paused clock.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::broker::BrokerClient;
use crate::error::Result;
use crate::types::{Order, OrderStatus};

/// Polling cadence and bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollConfig {
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Order reached `filled`.
    Filled(Order),
    /// Order reached a terminal status other than `filled`.
    Terminal(Order),
    /// Timeout elapsed first. `last` is the most recent successful read.
    TimedOut { last: Option<Order> },
}

impl PollOutcome {
    /// Most recent order state observed, if any.
    #[must_use]
    pub fn last_order(&self) -> Option<&Order> {
        match self {
            Self::Filled(order) | Self::Terminal(order) => Some(order),
            Self::TimedOut { last } => last.as_ref(),
        }
    }

    #[must_use]
    pub fn last_status(&self) -> Option<OrderStatus> {
        self.last_order().map(|o| o.status)
    }
}

/// Waits for `order_id` to reach a terminal status.
///
/// Transient read errors are logged and polling continues; any other error
/// is returned.
///
/// # Errors
/// Returns the first non-transient `BrokerError` raised by `get_order`.
pub async fn wait_for_terminal(
    broker: &dyn BrokerClient,
    order_id: &str,
    config: PollConfig,
) -> Result<PollOutcome> {
    let deadline = Instant::now() + config.timeout;
    let mut last: Option<Order> = None;

    loop {
        match broker.get_order(order_id).await {
            Ok(order) => {
                debug!(order_id = %order_id, status = %order.status, "Polled order");
                if order.is_filled() {
                    return Ok(PollOutcome::Filled(order));
                }
                if order.is_terminal() {
                    return Ok(PollOutcome::Terminal(order));
                }
                last = Some(order);
            }
            Err(e) if e.is_transient() => {
                warn!(order_id = %order_id, error = %e, "Transient error polling order");
            }
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(PollOutcome::TimedOut { last });
        }
        sleep(config.interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrokerError;
    use crate::mock::{MockBroker, StatusStep};
    use crate::types::OrderRequest;
    use rust_decimal_macros::dec;

    fn config(interval_secs: u64, timeout_secs: u64) -> PollConfig {
        PollConfig::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    async fn submit(broker: &MockBroker) -> String {
        broker
            .create_order(&OrderRequest::market_notional_buy("AAPL", dec!(100)))
            .await
            .unwrap()
            .id
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_filled_once_terminal() {
        let broker = MockBroker::new().with_order_script(vec![
            StatusStep::Status(OrderStatus::New),
            StatusStep::Status(OrderStatus::PartiallyFilled),
            StatusStep::Status(OrderStatus::Filled),
        ]);
        let id = submit(&broker).await;

        let started = Instant::now();
        let outcome = wait_for_terminal(&broker, &id, config(2, 120)).await.unwrap();

        assert!(matches!(outcome, PollOutcome::Filled(_)));
        assert_eq!(broker.get_order_calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_fill_terminal_is_reported() {
        let broker = MockBroker::new().with_order_script(vec![
            StatusStep::Status(OrderStatus::Accepted),
            StatusStep::Status(OrderStatus::Rejected),
        ]);
        let id = submit(&broker).await;

        let outcome = wait_for_terminal(&broker, &id, config(1, 30)).await.unwrap();
        assert_eq!(outcome.last_status(), Some(OrderStatus::Rejected));
        assert!(matches!(outcome, PollOutcome::Terminal(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_with_last_status() {
        let broker =
            MockBroker::new().with_order_script(vec![StatusStep::Status(OrderStatus::New)]);
        let id = submit(&broker).await;

        let started = Instant::now();
        let outcome = wait_for_terminal(&broker, &id, config(2, 10)).await.unwrap();

        match outcome {
            PollOutcome::TimedOut { last } => {
                assert_eq!(last.map(|o| o.status), Some(OrderStatus::New));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        // Reads at 0, 2, 4, 6, 8 and 10 seconds.
        assert_eq!(broker.get_order_calls(), 6);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_sleep_is_clamped_to_deadline() {
        let broker =
            MockBroker::new().with_order_script(vec![StatusStep::Status(OrderStatus::New)]);
        let id = submit(&broker).await;

        let started = Instant::now();
        wait_for_terminal(&broker, &id, config(4, 10)).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert_eq!(broker.get_order_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_skipped() {
        let broker = MockBroker::new().with_order_script(vec![
            StatusStep::TransientError,
            StatusStep::TransientError,
            StatusStep::Status(OrderStatus::Filled),
        ]);
        let id = submit(&broker).await;

        let outcome = wait_for_terminal(&broker, &id, config(1, 30)).await.unwrap();
        assert!(matches!(outcome, PollOutcome::Filled(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_only_errors_has_no_last() {
        let broker = MockBroker::new().with_order_script(vec![StatusStep::TransientError]);
        let id = submit(&broker).await;

        let outcome = wait_for_terminal(&broker, &id, config(1, 3)).await.unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut { last: None });
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_propagates() {
        let broker = MockBroker::new().with_order_script(vec![
            StatusStep::Status(OrderStatus::New),
            StatusStep::FatalError,
        ]);
        let id = submit(&broker).await;

        let err = wait_for_terminal(&broker, &id, config(1, 30)).await.unwrap_err();
        assert!(matches!(err, BrokerError::Api { .. }));
    }
}
