//! Recommendation sum type produced upstream and consumed once per run.
//!
//! The wire format is tagged by `kind`:
//!
//! ```json
//! {"kind":"stock","ticker":"AAPL","action":"buy","allocationPercent":"40"}
//! {"kind":"option_vertical_spread","underlyingTicker":"SPY","optionType":"call",
//!  "expirationDate":"2026-11-20","contracts":2,"allocationPercent":"50"}
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stock side requested by a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockAction {
    Buy,
    Sell,
}

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Single-letter flag used in OCC symbols.
    #[must_use]
    pub fn occ_flag(self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }

    /// Lowercase name as used by the brokerage API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecommendation {
    pub ticker: String,
    pub action: StockAction,
    pub allocation_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadRecommendation {
    pub underlying_ticker: String,
    pub option_type: OptionType,
    pub expiration_date: NaiveDate,
    pub contracts: u32,
    pub allocation_percent: Decimal,
}

/// A single trade recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    Stock(StockRecommendation),
    OptionVerticalSpread(SpreadRecommendation),
}

impl Recommendation {
    #[must_use]
    pub fn allocation_percent(&self) -> Decimal {
        match self {
            Self::Stock(stock) => stock.allocation_percent,
            Self::OptionVerticalSpread(spread) => spread.allocation_percent,
        }
    }

    /// Ticker the recommendation trades (underlying for spreads).
    #[must_use]
    pub fn ticker(&self) -> &str {
        match self {
            Self::Stock(stock) => &stock.ticker,
            Self::OptionVerticalSpread(spread) => &spread.underlying_ticker,
        }
    }

    /// Kind tag as it appears on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stock(_) => "stock",
            Self::OptionVerticalSpread(_) => "option_vertical_spread",
        }
    }
}

/// Recommendations partitioned by asset class, order preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationSet {
    pub stocks: Vec<StockRecommendation>,
    pub spreads: Vec<SpreadRecommendation>,
}

impl RecommendationSet {
    /// Splits a mixed list into its stock and spread subsets.
    #[must_use]
    pub fn split(recommendations: &[Recommendation]) -> Self {
        let mut set = Self::default();
        for rec in recommendations {
            match rec {
                Recommendation::Stock(stock) => set.stocks.push(stock.clone()),
                Recommendation::OptionVerticalSpread(spread) => set.spreads.push(spread.clone()),
            }
        }
        set
    }

    pub fn buys(&self) -> impl Iterator<Item = &StockRecommendation> {
        self.stocks.iter().filter(|s| s.action == StockAction::Buy)
    }

    pub fn sells(&self) -> impl Iterator<Item = &StockRecommendation> {
        self.stocks.iter().filter(|s| s.action == StockAction::Sell)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty() && self.spreads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn decodes_both_variants_from_tagged_json() {
        let raw = json!([
            {"kind": "stock", "ticker": "AAPL", "action": "buy", "allocationPercent": 60},
            {
                "kind": "option_vertical_spread",
                "underlyingTicker": "SPY",
                "optionType": "put",
                "expirationDate": "2026-11-20",
                "contracts": 3,
                "allocationPercent": "25.5"
            }
        ]);

        let recs: Vec<Recommendation> = serde_json::from_value(raw).unwrap();
        assert_eq!(recs.len(), 2);

        match &recs[0] {
            Recommendation::Stock(stock) => {
                assert_eq!(stock.ticker, "AAPL");
                assert_eq!(stock.action, StockAction::Buy);
                assert_eq!(stock.allocation_percent, dec!(60));
            }
            other => panic!("expected stock, got {other:?}"),
        }

        match &recs[1] {
            Recommendation::OptionVerticalSpread(spread) => {
                assert_eq!(spread.option_type, OptionType::Put);
                assert_eq!(spread.contracts, 3);
                assert_eq!(spread.allocation_percent, dec!(25.5));
                assert_eq!(
                    spread.expiration_date,
                    NaiveDate::from_ymd_opt(2026, 11, 20).unwrap()
                );
            }
            other => panic!("expected spread, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = json!({"kind": "crypto", "ticker": "BTC"});
        assert!(serde_json::from_value::<Recommendation>(raw).is_err());
    }

    #[test]
    fn split_preserves_order_within_each_class() {
        let recs = vec![
            Recommendation::Stock(StockRecommendation {
                ticker: "MSFT".into(),
                action: StockAction::Sell,
                allocation_percent: dec!(50),
            }),
            Recommendation::OptionVerticalSpread(SpreadRecommendation {
                underlying_ticker: "QQQ".into(),
                option_type: OptionType::Call,
                expiration_date: NaiveDate::from_ymd_opt(2026, 12, 18).unwrap(),
                contracts: 1,
                allocation_percent: dec!(40),
            }),
            Recommendation::Stock(StockRecommendation {
                ticker: "NVDA".into(),
                action: StockAction::Buy,
                allocation_percent: dec!(100),
            }),
        ];

        let set = RecommendationSet::split(&recs);
        assert_eq!(set.stocks.len(), 2);
        assert_eq!(set.spreads.len(), 1);
        assert_eq!(set.buys().map(|s| s.ticker.as_str()).collect::<Vec<_>>(), ["NVDA"]);
        assert_eq!(set.sells().map(|s| s.ticker.as_str()).collect::<Vec<_>>(), ["MSFT"]);
    }

    #[test]
    fn round_trips_kind_tag() {
        let rec = Recommendation::OptionVerticalSpread(SpreadRecommendation {
            underlying_ticker: "IWM".into(),
            option_type: OptionType::Call,
            expiration_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            contracts: 2,
            allocation_percent: dec!(30),
        });

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["kind"], "option_vertical_spread");
        assert_eq!(value["underlyingTicker"], "IWM");
        assert_eq!(rec.kind(), "option_vertical_spread");
    }
}
