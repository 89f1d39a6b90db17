//! Budget-allocation gate run once per cycle before any order is placed.
//!
//! Stock buy allocations, when present, must sum to exactly 100. Spread
//! allocations must sum to at most 100. Sells carry their own per-position
//! percentage and are not part of either sum.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::recommendation::{Recommendation, RecommendationSet};

/// Violation of a per-run budget invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetInvariantError {
    /// Stock buys exist but do not consume exactly the whole equity budget.
    #[error("stock buy allocations must sum to 100, got {sum}")]
    StockBuyAllocation { sum: Decimal },

    /// Spreads would consume more than the whole spread budget.
    #[error("option spread allocations must not exceed 100, got {sum}")]
    SpreadAllocationExceeded { sum: Decimal },
}

const FULL_ALLOCATION: Decimal = Decimal::ONE_HUNDRED;

/// Validates a recommendation list and returns it partitioned by asset class.
///
/// # Errors
/// Returns `BudgetInvariantError` if either allocation invariant is violated.
pub fn validate_recommendations(
    recommendations: &[Recommendation],
) -> Result<RecommendationSet, BudgetInvariantError> {
    let set = RecommendationSet::split(recommendations);

    if set.buys().next().is_some() {
        let sum: Decimal = set.buys().map(|b| b.allocation_percent).sum();
        if sum != FULL_ALLOCATION {
            return Err(BudgetInvariantError::StockBuyAllocation { sum });
        }
    }

    let spread_sum: Decimal = set.spreads.iter().map(|s| s.allocation_percent).sum();
    if spread_sum > FULL_ALLOCATION {
        return Err(BudgetInvariantError::SpreadAllocationExceeded { sum: spread_sum });
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendation::{
        OptionType, SpreadRecommendation, StockAction, StockRecommendation,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn stock(ticker: &str, action: StockAction, pct: Decimal) -> Recommendation {
        Recommendation::Stock(StockRecommendation {
            ticker: ticker.to_string(),
            action,
            allocation_percent: pct,
        })
    }

    fn spread(ticker: &str, pct: Decimal) -> Recommendation {
        Recommendation::OptionVerticalSpread(SpreadRecommendation {
            underlying_ticker: ticker.to_string(),
            option_type: OptionType::Call,
            expiration_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            contracts: 1,
            allocation_percent: pct,
        })
    }

    #[test]
    fn buys_summing_to_exactly_100_pass() {
        let recs = vec![
            stock("AAPL", StockAction::Buy, dec!(33.5)),
            stock("MSFT", StockAction::Buy, dec!(66.5)),
        ];
        let set = validate_recommendations(&recs).unwrap();
        assert_eq!(set.stocks.len(), 2);
    }

    #[test]
    fn buys_below_or_above_100_fail() {
        for pct in [dec!(99.99), dec!(100.01), dec!(0)] {
            let recs = vec![
                stock("AAPL", StockAction::Buy, pct),
            ];
            let err = validate_recommendations(&recs).unwrap_err();
            assert_eq!(err, BudgetInvariantError::StockBuyAllocation { sum: pct });
        }
    }

    #[test]
    fn sells_do_not_count_toward_buy_sum() {
        let recs = vec![
            stock("AAPL", StockAction::Buy, dec!(100)),
            stock("TSLA", StockAction::Sell, dec!(50)),
        ];
        assert!(validate_recommendations(&recs).is_ok());
    }

    #[test]
    fn sell_only_runs_skip_the_buy_check() {
        let recs = vec![stock("TSLA", StockAction::Sell, dec!(25))];
        assert!(validate_recommendations(&recs).is_ok());
    }

    #[test]
    fn spreads_at_or_under_100_pass() {
        let recs = vec![spread("SPY", dec!(60)), spread("QQQ", dec!(40))];
        assert!(validate_recommendations(&recs).is_ok());

        let recs = vec![spread("SPY", dec!(10))];
        assert!(validate_recommendations(&recs).is_ok());
    }

    #[test]
    fn spreads_over_100_fail_regardless_of_stocks() {
        let recs = vec![
            stock("AAPL", StockAction::Buy, dec!(100)),
            spread("SPY", dec!(60)),
            spread("QQQ", dec!(40.5)),
        ];
        let err = validate_recommendations(&recs).unwrap_err();
        assert_eq!(
            err,
            BudgetInvariantError::SpreadAllocationExceeded { sum: dec!(100.5) }
        );
    }

    #[test]
    fn valid_set_is_returned_partitioned() {
        let recs = vec![
            stock("AAPL", StockAction::Buy, dec!(60)),
            stock("MSFT", StockAction::Buy, dec!(40)),
            stock("TSLA", StockAction::Sell, dec!(50)),
            spread("SPY", dec!(100)),
        ];
        let set = validate_recommendations(&recs).unwrap();

        let buys: Vec<&str> = set.buys().map(|b| b.ticker.as_str()).collect();
        assert_eq!(buys, vec!["AAPL", "MSFT"]);
        assert_eq!(set.sells().count(), 1);
        assert_eq!(set.spreads.len(), 1);
    }

    #[test]
    fn empty_list_is_valid() {
        let set = validate_recommendations(&[]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn error_messages_carry_the_sum() {
        let err = BudgetInvariantError::StockBuyAllocation { sum: dec!(90) };
        assert!(err.to_string().contains("90"));
    }
}
