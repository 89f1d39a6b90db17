//! Vertical spread selection.
//!
//! Narrows a live chain to a strike band around spot, settles on one
//! expiration, then picks adjacent strikes around the at-the-money strike:
//! calls buy the nearest strike and sell the next one up, puts buy the nearest
//! strike and sell the next one down.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;

use trade_desk_alpaca::{BrokerClient, ChainFilter, OptionSnapshot, Result};
use trade_desk_core::{OptionType, SpreadRecommendation};

use crate::types::{OptionCandidate, VerticalSelection};

/// Lowest limit debit ever submitted.
pub const MIN_DEBIT: Decimal = dec!(0.01);

/// Inclusive strike range `spot ± band_pct%`.
#[must_use]
pub fn strike_band(spot: Decimal, band_pct: Decimal) -> (Decimal, Decimal) {
    let delta = spot * band_pct / Decimal::ONE_HUNDRED;
    (spot - delta, spot + delta)
}

/// Decodes chain listings, dropping unparseable symbols, other option types
/// and strikes outside `band`.
#[must_use]
pub fn candidates_from_chain(
    chain: &[OptionSnapshot],
    option_type: OptionType,
    band: (Decimal, Decimal),
) -> Vec<OptionCandidate> {
    let (min, max) = band;
    chain
        .iter()
        .filter_map(|snapshot| match OptionCandidate::from_snapshot(snapshot) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                debug!(symbol = %snapshot.symbol, error = %e, "Dropping unparseable listing");
                None
            }
        })
        .filter(|c| c.option_type == option_type && c.strike >= min && c.strike <= max)
        .collect()
}

/// Requested expiration if any candidate carries it, else the earliest one.
#[must_use]
pub fn choose_expiration(
    candidates: &[OptionCandidate],
    requested: NaiveDate,
) -> Option<NaiveDate> {
    if candidates.iter().any(|c| c.expiration == requested) {
        return Some(requested);
    }
    candidates.iter().map(|c| c.expiration).min()
}

/// Limit debit per share: `long.ask - short.bid`, or mid-to-mid when that is
/// not positive, floored at one cent and rounded to cents.
#[must_use]
pub fn limit_debit(long: &OptionCandidate, short: &OptionCandidate) -> Decimal {
    let natural = long.ask - short.bid;
    let debit = if natural > Decimal::ZERO {
        natural
    } else {
        long.mid - short.mid
    };
    debit
        .max(MIN_DEBIT)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Picks the two legs from already-filtered candidates.
///
/// Returns `None` when the chosen expiration has fewer than two distinct
/// strikes.
#[must_use]
pub fn select_vertical(
    candidates: &[OptionCandidate],
    spot: Decimal,
    option_type: OptionType,
    requested_expiration: NaiveDate,
) -> Option<VerticalSelection> {
    let typed: Vec<OptionCandidate> = candidates
        .iter()
        .filter(|c| c.option_type == option_type)
        .cloned()
        .collect();
    let expiration = choose_expiration(&typed, requested_expiration)?;

    // One listing per strike: the one with the largest bid + ask.
    let mut by_strike: BTreeMap<Decimal, &OptionCandidate> = BTreeMap::new();
    for candidate in typed.iter().filter(|c| c.expiration == expiration) {
        match by_strike.entry(candidate.strike) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                if candidate.quote_weight() > slot.get().quote_weight() {
                    slot.insert(candidate);
                }
            }
        }
    }

    let strikes: Vec<&OptionCandidate> = by_strike.into_values().collect();
    if strikes.len() < 2 {
        return None;
    }

    let nearest = nearest_index(&strikes, spot)?;
    let last = strikes.len() - 1;
    // Only calls fall back inward; a put nearest the lowest strike has no short leg.
    let (long_idx, short_idx) = match option_type {
        OptionType::Call if nearest < last => (nearest, nearest + 1),
        OptionType::Call => (last - 1, last),
        OptionType::Put if nearest > 0 => (nearest, nearest - 1),
        OptionType::Put => return None,
    };

    let long_leg = strikes.get(long_idx).copied()?.clone();
    let short_leg = strikes.get(short_idx).copied()?.clone();
    let limit_debit = limit_debit(&long_leg, &short_leg);

    Some(VerticalSelection {
        long_leg,
        short_leg,
        limit_debit,
    })
}

/// Index of the strike closest to spot; ties go to the lower strike.
fn nearest_index(strikes: &[&OptionCandidate], spot: Decimal) -> Option<usize> {
    let mut best: Option<(usize, Decimal)> = None;
    for (idx, candidate) in strikes.iter().enumerate() {
        let distance = (candidate.strike - spot).abs();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((idx, distance));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Fetches the chain for a recommendation and selects a vertical.
///
/// Looks up the requested expiration first and falls back to an unfiltered
/// expiration lookup when nothing usable is listed for it.
///
/// # Errors
/// Returns the brokerage error if a chain lookup fails.
pub async fn select_spread(
    broker: &dyn BrokerClient,
    recommendation: &SpreadRecommendation,
    spot: Decimal,
    band_pct: Decimal,
) -> Result<Option<VerticalSelection>> {
    let band = strike_band(spot, band_pct);
    let filter = ChainFilter::default()
        .with_option_type(recommendation.option_type)
        .with_strike_range(band.0, band.1);

    let chain = broker
        .get_option_chain(
            &recommendation.underlying_ticker,
            &filter.clone().with_expiration(recommendation.expiration_date),
        )
        .await?;
    let mut candidates = candidates_from_chain(&chain, recommendation.option_type, band);

    if candidates.is_empty() {
        debug!(
            ticker = %recommendation.underlying_ticker,
            expiration = %recommendation.expiration_date,
            "No listings for requested expiration, widening lookup"
        );
        let chain = broker
            .get_option_chain(&recommendation.underlying_ticker, &filter)
            .await?;
        candidates = candidates_from_chain(&chain, recommendation.option_type, band);
    }

    Ok(select_vertical(
        &candidates,
        spot,
        recommendation.option_type,
        recommendation.expiration_date,
    ))
}
