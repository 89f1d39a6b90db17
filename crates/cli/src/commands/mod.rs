//! CLI commands for the trade desk.

pub mod parse_symbol;
pub mod runtime;
pub mod serve;
pub mod trigger;

pub use parse_symbol::{run_parse_symbol, ParseSymbolArgs};
pub use runtime::Runtime;
pub use serve::{run_serve, ServeArgs};
pub use trigger::{run_catch_up, run_purchase, run_retry, CatchUpArgs, RetryArgs};
