//! Decodes an OCC option symbol. Needs no database or credentials.

use anyhow::Result;
use clap::Args;

use trade_desk_alpaca::parse_option_symbol;

/// Arguments for the parse-symbol command.
#[derive(Args, Debug, Clone)]
pub struct ParseSymbolArgs {
    /// OCC symbol, e.g. SPY261120C00105000
    pub symbol: String,
}

/// Prints the decoded symbol.
///
/// # Errors
/// Returns an error if the symbol is not OCC formatted.
pub fn run_parse_symbol(args: &ParseSymbolArgs) -> Result<()> {
    let parsed = parse_option_symbol(args.symbol.trim())?;
    println!("underlying: {}", parsed.underlying);
    println!("expiration: {}", parsed.expiration);
    println!("type:       {}", parsed.option_type);
    println!("strike:     {}", parsed.strike);
    Ok(())
}
