//! Budget arithmetic.
//!
//! Converts allocation percentages into notional amounts, sell quantities and
//! spread contract counts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Shares per option contract.
pub const CONTRACT_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// Dollar amount for `allocation_pct` of `budget`, truncated to cents so the
/// sum of buys never exceeds the budget.
#[must_use]
pub fn notional_for(budget: Decimal, allocation_pct: Decimal) -> Decimal {
    (budget * allocation_pct / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Result of sizing a sell against a held position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SellSizing {
    Quantity(Decimal),
    NoPosition,
    InvalidAllocation(Decimal),
    ZeroQuantity,
}

/// Quantity to sell: `held * allocation_pct / 100`, floored to `decimals`
/// places and capped at `held`.
#[must_use]
pub fn sell_quantity(held: Decimal, allocation_pct: Decimal, decimals: u32) -> SellSizing {
    if held <= Decimal::ZERO {
        return SellSizing::NoPosition;
    }
    if allocation_pct <= Decimal::ZERO || allocation_pct > Decimal::ONE_HUNDRED {
        return SellSizing::InvalidAllocation(allocation_pct);
    }

    let qty = (held * allocation_pct / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
        .min(held);

    if qty <= Decimal::ZERO {
        SellSizing::ZeroQuantity
    } else {
        SellSizing::Quantity(qty.normalize())
    }
}

/// Whole contracts `budget` pays for at `limit_debit` per share.
#[must_use]
pub fn affordable_contracts(budget: Decimal, limit_debit: Decimal) -> u32 {
    if budget <= Decimal::ZERO || limit_debit <= Decimal::ZERO {
        return 0;
    }
    let per_contract = limit_debit * CONTRACT_MULTIPLIER;
    (budget / per_contract).floor().to_u32().unwrap_or(u32::MAX)
}

/// Contracts to submit: the affordable count capped at the requested count.
#[must_use]
pub fn contracts_to_buy(budget: Decimal, limit_debit: Decimal, requested: u32) -> u32 {
    affordable_contracts(budget, limit_debit).min(requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn notional_is_share_of_budget() {
        assert_eq!(notional_for(dec!(1000), dec!(40)), dec!(400));
        assert_eq!(notional_for(dec!(1000), dec!(33.333)), dec!(333.33));
        assert_eq!(notional_for(dec!(100), dec!(0.009)), dec!(0));
    }

    #[test]
    fn half_of_ten_shares_is_five() {
        assert_eq!(sell_quantity(dec!(10), dec!(50), 4), SellSizing::Quantity(dec!(5)));
    }

    #[test]
    fn sell_quantity_is_floored_and_capped() {
        assert_eq!(
            sell_quantity(dec!(3), dec!(33.33333), 4),
            SellSizing::Quantity(dec!(0.9999))
        );
        assert_eq!(sell_quantity(dec!(7.5), dec!(100), 4), SellSizing::Quantity(dec!(7.5)));
        assert_eq!(sell_quantity(dec!(0.00001), dec!(50), 4), SellSizing::ZeroQuantity);
    }

    #[test]
    fn sell_preconditions() {
        assert_eq!(sell_quantity(dec!(0), dec!(50), 4), SellSizing::NoPosition);
        assert_eq!(sell_quantity(dec!(-2), dec!(50), 4), SellSizing::NoPosition);
        assert_eq!(
            sell_quantity(dec!(10), dec!(0), 4),
            SellSizing::InvalidAllocation(dec!(0))
        );
        assert_eq!(
            sell_quantity(dec!(10), dec!(150), 4),
            SellSizing::InvalidAllocation(dec!(150))
        );
    }

    #[test]
    fn twenty_dollars_buys_no_three_dollar_spread() {
        assert_eq!(affordable_contracts(dec!(20), dec!(3.00)), 0);
        assert_eq!(contracts_to_buy(dec!(20), dec!(3.00), 5), 0);
    }

    #[test]
    fn contracts_capped_by_request() {
        assert_eq!(affordable_contracts(dec!(1000), dec!(1.50)), 6);
        assert_eq!(contracts_to_buy(dec!(1000), dec!(1.50), 2), 2);
        assert_eq!(contracts_to_buy(dec!(1000), dec!(1.50), 10), 6);
        assert_eq!(affordable_contracts(dec!(1000), dec!(0)), 0);
    }
}
