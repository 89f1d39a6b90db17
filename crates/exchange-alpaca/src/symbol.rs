//! OCC option symbol decoding.
//!
//! Format: 1-6 letter root, `YYMMDD` expiration, `C` or `P`, and an 8-digit
//! strike scaled by 1000. `SPY261120C00105000` is the SPY 2026-11-20 105 call.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trade_desk_core::OptionType;

use crate::error::SymbolParseError;

const OCC_PATTERN: &str = r"^([A-Z]{1,6})(\d{6})([CP])(\d{8})$";

/// Strike digits carry three implied decimals.
const STRIKE_SCALE: u32 = 3;

fn occ_regex() -> Result<&'static Regex, SymbolParseError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(OCC_PATTERN))
        .as_ref()
        .map_err(|e| SymbolParseError::Format(e.to_string()))
}

/// Decoded identity of a listed option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedOptionSymbol {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: Decimal,
}

/// Decodes an OCC option symbol.
///
/// # Errors
/// Returns `SymbolParseError` if the text does not match the fixed layout or
/// the date digits are not a calendar date.
pub fn parse_option_symbol(symbol: &str) -> Result<ParsedOptionSymbol, SymbolParseError> {
    let caps = occ_regex()?
        .captures(symbol)
        .ok_or_else(|| SymbolParseError::Format(symbol.to_string()))?;

    let underlying = caps[1].to_string();

    let expiration = NaiveDate::parse_from_str(&caps[2], "%y%m%d")
        .map_err(|_| SymbolParseError::InvalidDate(symbol.to_string()))?;

    let option_type = match &caps[3] {
        "C" => OptionType::Call,
        _ => OptionType::Put,
    };

    let raw_strike: i64 = caps[4]
        .parse()
        .map_err(|_| SymbolParseError::InvalidStrike(symbol.to_string()))?;
    let strike = Decimal::new(raw_strike, STRIKE_SCALE).normalize();

    Ok(ParsedOptionSymbol {
        underlying,
        expiration,
        option_type,
        strike,
    })
}

/// Encodes an option identity back to its OCC symbol.
#[must_use]
pub fn format_option_symbol(
    underlying: &str,
    expiration: NaiveDate,
    option_type: OptionType,
    strike: Decimal,
) -> String {
    let scaled = (strike * Decimal::from(1000)).trunc();
    format!(
        "{}{}{}{:08}",
        underlying,
        expiration.format("%y%m%d"),
        option_type.occ_flag(),
        scaled
    )
}
