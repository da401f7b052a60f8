//! Market odds module.
//!
//! This module handles:
//! - Odds representation in decimal, American and fractional formats
//! - Parsing odds strings as supplied by the historical data source
//! - Conversion to implied probability and payout multiplier

pub mod converter;
pub mod types;

pub use converter::{convert, convert_str, ImpliedOdds};
pub use types::Odds;
